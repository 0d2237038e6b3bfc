//! Chain compilation: handler references to an executable pipeline.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{CompileResult, ConfigurationError};
use crate::observability::metrics;
use crate::pipeline::catalog::{self, HandlerRef, HandlerSpec};
use crate::pipeline::codegen::{self, CodeArtifact};
use crate::pipeline::template;
use crate::rewrite::auth::encode_credentials;
use crate::rewrite::{EventType, Handler, Message, Outcome, WebpageRewriteStrategy};

/// One resolved handler together with its in-memory implementation.
#[derive(Debug)]
struct Step {
    spec: HandlerSpec,
    handler: Box<dyn Handler>,
}

/// An ordered, compiled chain of handlers for one event type.
#[derive(Debug)]
pub struct Pipeline {
    name: String,
    event_type: EventType,
    steps: Vec<Step>,
}

impl Pipeline {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn handler_names(&self) -> Vec<&str> {
        self.steps.iter().map(|step| step.spec.name()).collect()
    }

    pub fn specs(&self) -> impl Iterator<Item = &HandlerSpec> {
        self.steps.iter().map(|step| &step.spec)
    }

    /// Run the chain over one message.
    ///
    /// Handlers run in order; the first `Stop` ends the run and its message is
    /// the result. Otherwise the last handler's output is returned.
    pub fn run(&self, input: Message) -> Message {
        let mut current = input;
        for step in &self.steps {
            match step.handler.handle(current) {
                Outcome::Continue(next) => current = next,
                Outcome::Stop(done) => {
                    debug!(pipeline = %self.name, handler = %step.spec.name(), "Chain stopped");
                    return done;
                }
            }
        }
        current
    }

    /// Render the edge program for this chain.
    pub fn to_artifact(&self) -> CodeArtifact {
        codegen::render(self)
    }
}

/// A compiled chain and the code deployed for it.
#[derive(Debug, Clone)]
pub struct CompiledFunction {
    pub pipeline: Arc<Pipeline>,
    pub artifact: CodeArtifact,
}

impl CompiledFunction {
    pub fn name(&self) -> &str {
        &self.artifact.name
    }
}

/// Check and instantiate resolved handlers for one chain.
pub fn compile_pipeline(
    name: &str,
    event_type: EventType,
    specs: Vec<HandlerSpec>,
) -> CompileResult<Pipeline> {
    let mut seen_names = HashSet::new();
    let mut seen_functions = HashSet::new();
    let mut steps = Vec::with_capacity(specs.len());

    for spec in specs {
        if let Some(expected) = spec.event_type() {
            if expected != event_type {
                return Err(ConfigurationError::PhaseMismatch {
                    chain: name.to_string(),
                    handler: spec.name().to_string(),
                    expected: expected.to_string(),
                    actual: event_type.to_string(),
                });
            }
        }

        if !seen_names.insert(spec.name().to_string())
            || !seen_functions.insert(spec.function_name().to_string())
        {
            return Err(ConfigurationError::DuplicateHandler {
                chain: name.to_string(),
                name: spec.name().to_string(),
            });
        }

        if spec.entry().is_some() {
            let values = spec.template_values();
            if let Some(key) = template::referenced_keys(spec.template())
                .into_iter()
                .find(|key| !values.contains_key(key))
            {
                return Err(ConfigurationError::MissingParameter {
                    handler: spec.name().to_string(),
                    parameter: key.to_ascii_lowercase(),
                });
            }
        }

        let handler = spec.instantiate(event_type)?;
        debug!(chain = %name, handler = %spec.name(), "Handler compiled");
        metrics::record_handler_compiled(spec.name());
        steps.push(Step { spec, handler });
    }

    Ok(Pipeline {
        name: name.to_string(),
        event_type,
        steps,
    })
}

fn compile_refs(
    name: &str,
    event_type: EventType,
    handlers: &[HandlerRef],
) -> CompileResult<CompiledFunction> {
    let specs = handlers
        .iter()
        .map(catalog::resolve)
        .collect::<CompileResult<Vec<_>>>()?;
    let pipeline = compile_pipeline(name, event_type, specs)?;
    let artifact = codegen::render(&pipeline);

    info!(
        function = %name,
        event_type = %event_type,
        handlers = pipeline.len(),
        digest = %artifact.digest,
        "Pipeline compiled"
    );
    metrics::record_pipeline_compiled(event_type);

    Ok(CompiledFunction {
        pipeline: Arc::new(pipeline),
        artifact,
    })
}

/// Compile a handler list. An empty list yields no pipeline.
pub fn build(
    name: &str,
    event_type: EventType,
    handlers: &[HandlerRef],
) -> CompileResult<Option<CompiledFunction>> {
    if handlers.is_empty() {
        return Ok(None);
    }
    compile_refs(name, event_type, handlers)
        .map(Some)
        .inspect_err(|_| metrics::record_compile_error("pipeline"))
}

/// Append-only builder for one chain.
///
/// ```text
/// let mut chain = ChainBuilder::viewer_request("site-route-docs");
/// chain.with_basic_auth("user", "pass")?.rewrite_webpage_path(WebpageRewriteStrategy::File)?;
/// let compiled = chain.compile()?;
/// ```
#[derive(Debug)]
pub struct ChainBuilder {
    name: String,
    event_type: EventType,
    handlers: Vec<HandlerRef>,
    frozen: bool,
}

impl ChainBuilder {
    pub fn new(name: impl Into<String>, event_type: EventType) -> Self {
        Self {
            name: name.into(),
            event_type,
            handlers: Vec::new(),
            frozen: false,
        }
    }

    pub fn viewer_request(name: impl Into<String>) -> Self {
        Self::new(name, EventType::ViewerRequest)
    }

    pub fn viewer_response(name: impl Into<String>) -> Self {
        Self::new(name, EventType::ViewerResponse)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    fn ensure_open(&self) -> CompileResult<()> {
        if self.frozen {
            return Err(ConfigurationError::ChainFrozen {
                chain: self.name.clone(),
            });
        }
        Ok(())
    }

    /// Append any handler reference.
    pub fn handler(&mut self, handler: HandlerRef) -> CompileResult<&mut Self> {
        self.ensure_open()?;
        self.handlers.push(handler);
        Ok(self)
    }

    pub fn redirect_permanently(&mut self, target: impl Into<String>) -> CompileResult<&mut Self> {
        self.handler(HandlerRef::redirect(target))
    }

    pub fn rewrite_webpage_path(
        &mut self,
        strategy: WebpageRewriteStrategy,
    ) -> CompileResult<&mut Self> {
        self.handler(HandlerRef::webpage(strategy))
    }

    pub fn rewrite_path_element(
        &mut self,
        index: usize,
        replacement: impl Into<String>,
    ) -> CompileResult<&mut Self> {
        self.handler(HandlerRef::path_element(index, replacement))
    }

    pub fn rewrite_path<S: AsRef<str>>(
        &mut self,
        pattern: impl Into<String>,
        replacements: &[S],
    ) -> CompileResult<&mut Self> {
        self.handler(HandlerRef::path_regex(pattern, replacements))
    }

    pub fn rewrite_path_to(&mut self, path: impl Into<String>) -> CompileResult<&mut Self> {
        self.handler(HandlerRef::path_to(path))
    }

    pub fn with_basic_auth(&mut self, username: &str, password: &str) -> CompileResult<&mut Self> {
        self.handler(HandlerRef::basic_auth(encode_credentials(username, password)))
    }

    pub fn status_code(&mut self, status_code: u16) -> CompileResult<&mut Self> {
        self.handler(HandlerRef::status_code(status_code))
    }

    pub fn with_cache_control(&mut self, immutable: bool) -> CompileResult<&mut Self> {
        self.handler(HandlerRef::cache_control(immutable))
    }

    pub fn with_security_headers(&mut self) -> CompileResult<&mut Self> {
        self.handler(HandlerRef::security_headers())
    }

    /// Compile the chain, or `None` when no handler was added.
    pub fn compile(&mut self) -> CompileResult<Option<CompiledFunction>> {
        self.ensure_open()?;
        self.frozen = true;
        build(&self.name, self.event_type, &self.handlers)
    }

    /// Compile the chain even when it is empty.
    pub fn compile_required(&mut self) -> CompileResult<CompiledFunction> {
        self.ensure_open()?;
        self.frozen = true;
        compile_refs(&self.name, self.event_type, &self.handlers)
            .inspect_err(|_| metrics::record_compile_error("pipeline"))
    }
}
