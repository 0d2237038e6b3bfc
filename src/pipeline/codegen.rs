//! Edge program generation.
//!
//! Turns a compiled `Pipeline` into one self-contained program for the edge
//! runtime: the chain array, the `handler(event)` entry point and one section
//! per handler with its parameters substituted as literals.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::pipeline::chain::Pipeline;
use crate::pipeline::template;
use crate::rewrite::EventType;

/// Runtime identifier the generated code targets.
pub const RUNTIME: &str = "cloudfront-js-2.0";

/// Generated code plus the metadata the edge-compute collaborator needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeArtifact {
    pub name: String,
    pub event_type: EventType,
    pub runtime: String,
    pub comment: String,
    /// `sha256:<hex>` of `code`.
    pub digest: String,
    #[serde(skip_serializing, default)]
    pub code: String,
}

impl CodeArtifact {
    fn new(name: &str, event_type: EventType, comment: String, code: String) -> Self {
        let digest = format!("sha256:{}", hex::encode(Sha256::digest(code.as_bytes())));
        Self {
            name: name.to_string(),
            event_type,
            runtime: RUNTIME.to_string(),
            comment,
            digest,
            code,
        }
    }
}

fn section_header(name: &str) -> String {
    format!("// ----------- Handler: {name} -----------")
}

/// Render the program for `pipeline`. Output is byte-identical for identical input.
pub fn render(pipeline: &Pipeline) -> CodeArtifact {
    let field = pipeline.event_type().event_field();
    let names = pipeline.handler_names();
    let comment = if names.is_empty() {
        format!("{} pass-through", pipeline.event_type())
    } else {
        format!("{}: {}", pipeline.event_type(), names.join(", "))
    };

    let functions: Vec<&str> = pipeline.specs().map(|spec| spec.function_name()).collect();

    let mut code = format!(
        "// {name} ({comment})\n\
         var handlerChain = [{chain}];\n\
         \n\
         function handler(event) {{\n\
         \x20   var input = event.{field};\n\
         \x20   for (var i = 0; i < handlerChain.length; i++) {{\n\
         \x20       var output = handlerChain[i](input);\n\
         \x20       input = output.{field};\n\
         \x20       if (output.stop) {{\n\
         \x20           return input;\n\
         \x20       }}\n\
         \x20   }}\n\
         \x20   return input;\n\
         }}\n",
        name = pipeline.name(),
        chain = functions.join(", "),
    );

    for spec in pipeline.specs() {
        let literals: BTreeMap<String, String> = spec
            .template_values()
            .iter()
            .map(|(key, value)| (key.clone(), template::js_literal(value)))
            .collect();
        code.push('\n');
        code.push_str(&section_header(spec.name()));
        code.push('\n');
        code.push_str(template::substitute(spec.template(), &literals).trim_end());
        code.push('\n');
    }

    CodeArtifact::new(pipeline.name(), pipeline.event_type(), comment, code)
}
