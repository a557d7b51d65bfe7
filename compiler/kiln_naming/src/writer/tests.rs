use kiln_ir::ValueType;
use pretty_assertions::assert_eq;

use super::*;

fn render(minified: bool, write: impl FnOnce(&mut OutputSourceWriter<'_>)) -> String {
    let mut naming = if minified {
        NamingStrategy::minifying()
    } else {
        NamingStrategy::readable()
    };
    let mut writer = OutputSourceWriter::new(&mut naming, minified);
    write(&mut writer);
    writer.finish()
}

fn function_body(out: &mut OutputSourceWriter<'_>) {
    out.append("function ");
    out.append_static_method(&MethodReference::new(
        "app.Main",
        MethodDescriptor::new("run", vec![], ValueType::Void),
    ));
    out.append("()");
    out.ws();
    out.append("{");
    out.soft_newline();
    out.indent();
    out.append("return ");
    out.append_static_field(&FieldReference::new("app.Main", "count"));
    out.append(";");
    out.soft_newline();
    out.outdent();
    out.append("}");
    out.newline();
}

#[test]
fn readable_output_is_laid_out() {
    assert_eq!(
        render(false, function_body),
        "function a_Main_run() {\n    return a_Main_count;\n}\n"
    );
}

#[test]
fn minified_output_drops_layout_hints() {
    assert_eq!(render(true, function_body), "function a(){return b;}\n");
}

#[test]
fn outdent_saturates() {
    assert_eq!(
        render(false, |out| {
            out.outdent();
            out.append("x");
        }),
        "x"
    );
}
