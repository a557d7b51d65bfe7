use kiln_ir::ValueType;
use pretty_assertions::assert_eq;

use super::*;

fn descriptor(name: &str) -> MethodDescriptor {
    MethodDescriptor::new(name, vec![], ValueType::Void)
}

#[test]
fn classes_use_package_initials() {
    let mut provider = DefaultAliasProvider::new();
    assert_eq!(provider.class_alias("java.util.ArrayList"), "ju_ArrayList");
    assert_eq!(provider.class_alias("Main"), "Main");
    assert_eq!(provider.class_alias("Outer$Inner"), "Outer_Inner");
    // Same initials and simple name.
    assert_eq!(provider.class_alias("java.utils.ArrayList"), "ju_ArrayList$1");
}

#[test]
fn static_members_carry_their_class() {
    let mut provider = DefaultAliasProvider::new();
    let method = MethodReference::new("app.Main", descriptor("main"));
    assert_eq!(provider.static_method_alias(&method), "a_Main_main");
    let field = FieldReference::new("app.Main", "count");
    assert_eq!(provider.static_field_alias(&field), "a_Main_count");
    assert_eq!(provider.class_init_alias("app.Main"), "a_Main_clinit");
}

#[test]
fn members_share_one_namespace() {
    let mut provider = DefaultAliasProvider::new();
    assert_eq!(provider.method_alias(&descriptor("size")), "size");
    assert_eq!(provider.method_alias(&descriptor("<init>")), "_init_");
    assert_eq!(provider.field_alias(&FieldReference::new("A", "size")), "f_size");
    assert_eq!(provider.field_alias(&FieldReference::new("B", "size")), "f_size$1");
}

#[test]
fn top_level_and_members_are_independent() {
    let mut provider = DefaultAliasProvider::new();
    assert_eq!(provider.function_alias("size"), "size");
    assert_eq!(provider.method_alias(&descriptor("size")), "size");
    assert_eq!(provider.function_alias("delete"), "delete_");
}
