use crate::schema::{DescBody, DescId, SchemaPool, Type};
use crate::test_utils::{
    compile, compile_ok, constant, field, generic, member, rendered, strukt, strukt_fixed, targ,
    tsize, ty, vint,
};

fn field_type(pool: &SchemaPool, file: DescId, field_path: &str) -> Type {
    match &pool.entry(member(pool, file, field_path)).body {
        DescBody::Field(body) => body.ty.clone(),
        other => panic!("'{field_path}' is not a field: {other:?}"),
    }
}

#[test]
fn list_of_primitive() {
    let (pool, file) = compile_ok(vec![strukt(
        1,
        "S",
        vec![field(2, "f", 0, generic(2, "List", vec![targ(ty(2, "Int32"))]))],
    )]);
    assert_eq!(
        field_type(&pool, file, "S.f"),
        Type::List(Box::new(Type::Int32))
    );
}

#[test]
fn list_requires_one_type_parameter() {
    let (_, _, errors) = compile(vec![strukt(
        1,
        "S",
        vec![field(2, "f", 0, generic(2, "List", vec![]))],
    )]);
    assert!(rendered(&errors).contains("'List' requires exactly one type parameter."));

    let (_, _, errors) = compile(vec![strukt(
        1,
        "S",
        vec![field(
            2,
            "f",
            0,
            generic(2, "List", vec![targ(ty(2, "Int32")), targ(ty(2, "Bool"))]),
        )],
    )]);
    assert!(rendered(&errors).contains("'List' requires exactly one type parameter."));
}

#[test]
fn list_rejects_inline_elements() {
    let (_, _, errors) = compile(vec![
        strukt_fixed(1, "F", 64, 0, vec![field(2, "x", 0, ty(2, "Int64"))]),
        strukt(
            3,
            "S",
            vec![field(
                4,
                "f",
                0,
                generic(
                    4,
                    "List",
                    vec![targ(generic(4, "Inline", vec![targ(ty(4, "F"))]))],
                ),
            )],
        ),
    ]);
    assert!(rendered(&errors).contains("Don't declare list elements 'Inline'."));
}

#[test]
fn inline_takes_a_fixed_width_struct() {
    let (pool, file) = compile_ok(vec![
        strukt_fixed(1, "F", 64, 0, vec![field(2, "x", 0, ty(2, "Int64"))]),
        strukt(
            3,
            "S",
            vec![field(4, "f", 0, generic(4, "Inline", vec![targ(ty(4, "F"))]))],
        ),
    ]);
    let fixed = member(&pool, file, "F");
    assert_eq!(field_type(&pool, file, "S.f"), Type::InlineStruct(fixed));
}

#[test]
fn inline_rejects_non_fixed_structs() {
    let (_, _, errors) = compile(vec![
        strukt(1, "Loose", vec![]),
        strukt(
            2,
            "S",
            vec![field(
                3,
                "f",
                0,
                generic(3, "Inline", vec![targ(ty(3, "Loose"))]),
            )],
        ),
    ]);
    assert!(rendered(&errors).contains("'Inline' may only be applied to fixed-width structs."));
}

#[test]
fn inline_rejects_non_structs() {
    let (_, _, errors) = compile(vec![strukt(
        1,
        "S",
        vec![field(
            2,
            "f",
            0,
            generic(2, "Inline", vec![targ(ty(2, "Int32"))]),
        )],
    )]);
    assert!(rendered(&errors).contains("'Inline' parameter must be a struct."));
}

#[test]
fn inline_list_of_primitives() {
    let (pool, file) = compile_ok(vec![strukt(
        1,
        "S",
        vec![field(
            2,
            "f",
            0,
            generic(2, "InlineList", vec![targ(ty(2, "Int32")), tsize(2, 4)]),
        )],
    )]);
    assert_eq!(
        field_type(&pool, file, "S.f"),
        Type::InlineList(Box::new(Type::Int32), 4)
    );
}

#[test]
fn inline_list_of_fixed_structs_inlines_them() {
    let (pool, file) = compile_ok(vec![
        strukt_fixed(1, "F", 64, 0, vec![field(2, "x", 0, ty(2, "Int64"))]),
        strukt(
            3,
            "S",
            vec![field(
                4,
                "f",
                0,
                generic(4, "InlineList", vec![targ(ty(4, "F")), tsize(4, 2)]),
            )],
        ),
    ]);
    let fixed = member(&pool, file, "F");
    assert_eq!(
        field_type(&pool, file, "S.f"),
        Type::InlineList(Box::new(Type::InlineStruct(fixed)), 2)
    );
}

#[test]
fn inline_list_requires_two_parameters() {
    let (_, _, errors) = compile(vec![strukt(
        1,
        "S",
        vec![field(
            2,
            "f",
            0,
            generic(2, "InlineList", vec![targ(ty(2, "Int32"))]),
        )],
    )]);
    assert!(
        rendered(&errors)
            .contains("'InlineList' requires exactly two parameters: an element type and a size.")
    );
}

#[test]
fn inline_list_rejects_inline_and_nested_inline_list_elements() {
    let (_, _, errors) = compile(vec![
        strukt_fixed(1, "F", 64, 0, vec![field(2, "x", 0, ty(2, "Int64"))]),
        strukt(
            3,
            "S",
            vec![field(
                4,
                "f",
                0,
                generic(
                    4,
                    "InlineList",
                    vec![
                        targ(generic(4, "Inline", vec![targ(ty(4, "F"))])),
                        tsize(4, 2),
                    ],
                ),
            )],
        ),
    ]);
    assert!(rendered(&errors).contains("Don't declare list elements 'Inline'."));

    let (_, _, errors) = compile(vec![strukt(
        1,
        "S",
        vec![field(
            2,
            "f",
            0,
            generic(
                2,
                "InlineList",
                vec![
                    targ(generic(
                        2,
                        "InlineList",
                        vec![targ(ty(2, "Int32")), tsize(2, 2)],
                    )),
                    tsize(2, 3),
                ],
            ),
        )],
    )]);
    assert!(rendered(&errors).contains("Inline lists can't contain other inline lists."));
}

#[test]
fn inline_list_rejects_loose_struct_elements() {
    let (_, _, errors) = compile(vec![
        strukt(1, "Loose", vec![]),
        strukt(
            2,
            "S",
            vec![field(
                3,
                "f",
                0,
                generic(3, "InlineList", vec![targ(ty(3, "Loose")), tsize(3, 2)]),
            )],
        ),
    ]);
    assert!(rendered(&errors).contains("Inline list elements must be fixed-width structs."));
}

#[test]
fn primitives_take_no_parameters() {
    let (_, _, errors) = compile(vec![strukt(
        1,
        "S",
        vec![field(
            2,
            "f",
            0,
            generic(2, "Int32", vec![targ(ty(2, "Bool"))]),
        )],
    )]);
    assert!(rendered(&errors).contains("'Int32' doesn't take parameters."));
}

#[test]
fn non_type_declarations_are_rejected() {
    let (_, _, errors) = compile(vec![
        constant(1, "c", ty(1, "Int32"), vint(1, 1)),
        strukt(2, "S", vec![field(3, "f", 0, ty(3, "c"))]),
    ]);
    assert!(rendered(&errors).contains("'c' is not a type."));

    let (_, _, errors) = compile(vec![strukt(
        1,
        "S",
        vec![field(2, "f", 0, ty(2, "id"))],
    )]);
    assert!(rendered(&errors).contains("'id' is not a type."));
}

#[test]
fn inline_of_self_is_a_cycle_not_a_hang() {
    let (_, _, errors) = compile(vec![strukt_fixed(
        1,
        "S",
        64,
        0,
        vec![field(2, "f", 0, generic(2, "Inline", vec![targ(ty(2, "S"))]))],
    )]);
    assert!(rendered(&errors).contains("'S' depends on itself."));
}
