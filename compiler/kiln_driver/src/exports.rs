//! Export table: one entry per lowered method, binding its alias to the
//! function that implements it.
//!
//! ```text
//! export a_Main_run = "app.Main.run()I";
//! export a_Main.size = "app.Main.size()I";
//! export a_Main_clinit = "app.Main.<clinit>()V";
//! ```
//!
//! The table is recorded symbolically, so the same recording renders with
//! readable or minified aliases.

use kiln_ir::MethodNode;
use kiln_naming::{NamingStrategy, OutputSourceWriter, RememberedSource, SourceWriter};
use kiln_target::method_function_name;

pub(crate) const CLASS_INIT: &str = "<clinit>";

#[tracing::instrument(level = "debug", skip_all, fields(methods = methods.len()))]
pub(crate) fn record_exports(methods: &[&MethodNode]) -> RememberedSource {
    let mut source = RememberedSource::new();
    for method in methods {
        let reference = &method.reference;
        source.append("export ");
        if reference.name() == CLASS_INIT {
            source.append_class_init(&reference.class);
        } else if method.is_static() {
            source.append_static_method(reference);
        } else {
            source.append_class(&reference.class);
            source.append(".");
            source.append_method(&reference.descriptor);
        }
        source.ws();
        source.append("=");
        source.ws();
        source.append(&format!("{:?};", &*method_function_name(reference)));
        source.soft_newline();
    }
    source.flush();
    source
}

pub(crate) fn render_exports(source: &RememberedSource, minified: bool) -> String {
    let mut naming = if minified {
        NamingStrategy::minifying()
    } else {
        NamingStrategy::readable()
    };
    let mut out = OutputSourceWriter::new(&mut naming, minified);
    source.replay(&mut out);
    out.finish()
}
