//! Template engine based on MiniJinja

use dyff_core::{LoadedPack, TemplateContext};
use minijinja::Environment;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

use crate::error::{EngineError, Result, TemplateError};
use crate::filters;
use crate::functions;

/// Result of rendering a pack
#[derive(Debug, Default)]
pub struct RenderResult {
    /// Rendered manifests keyed by template path (without `.j2`), in path order
    pub manifests: BTreeMap<String, String>,

    /// Rendered NOTES template, if the pack has one
    pub notes: Option<String>,
}

/// Template engine builder
pub struct EngineBuilder {
    strict_mode: bool,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self { strict_mode: true }
    }

    /// Set strict mode (fail on undefined variables)
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict_mode = strict;
        self
    }

    pub fn build(self) -> Engine {
        Engine::new(self.strict_mode)
    }
}

/// The template engine
pub struct Engine {
    strict_mode: bool,
}

impl Engine {
    pub fn new(strict_mode: bool) -> Self {
        Self { strict_mode }
    }

    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    fn create_environment(&self) -> Environment<'static> {
        let mut env = Environment::new();

        if self.strict_mode {
            env.set_undefined_behavior(minijinja::UndefinedBehavior::Strict);
        } else {
            env.set_undefined_behavior(minijinja::UndefinedBehavior::Lenient);
        }

        env.add_filter("toyaml", filters::toyaml);
        env.add_filter("tojson", filters::tojson);
        env.add_filter("b64encode", filters::b64encode);
        env.add_filter("b64decode", filters::b64decode);
        env.add_filter("quote", filters::quote);
        env.add_filter("squote", filters::squote);
        env.add_filter("nindent", filters::nindent);
        env.add_filter("indent", filters::indent);
        env.add_filter("required", filters::required);
        env.add_filter("empty", filters::empty);
        env.add_filter("sha256", filters::sha256sum);
        env.add_filter("trunc", filters::trunc);
        env.add_filter("trimprefix", filters::trimprefix);
        env.add_filter("trimsuffix", filters::trimsuffix);

        env.add_function("fail", functions::fail);
        env.add_function("dict", functions::dict);
        env.add_function("list", functions::list);
        env.add_function("get", functions::get);
        env.add_function("coalesce", functions::coalesce);
        env.add_function("ternary", functions::ternary);
        env.add_function("tostring", functions::tostring);
        env.add_function("toint", functions::toint);
        env.add_function("printf", functions::printf);

        env
    }

    fn render_context(context: &TemplateContext) -> minijinja::Value {
        minijinja::context! {
            values => &context.values,
            release => &context.release,
            pack => &context.pack,
            capabilities => &context.capabilities,
        }
    }

    /// Render a single template string
    pub fn render_string(
        &self,
        template: &str,
        context: &TemplateContext,
        template_name: &str,
    ) -> Result<String> {
        let mut env = self.create_environment();

        env.add_template_owned(template_name.to_string(), template.to_string())
            .map_err(|e| TemplateError::from_minijinja(e, template_name, template, None))?;

        let tmpl = env
            .get_template(template_name)
            .map_err(|e| TemplateError::from_minijinja(e, template_name, template, None))?;

        tmpl.render(Self::render_context(context)).map_err(|e| {
            EngineError::from(TemplateError::from_minijinja(
                e,
                template_name,
                template,
                Some(&context.values),
            ))
        })
    }

    /// Render all templates in a pack
    ///
    /// Helper templates (file name starting with `_`) are loaded for
    /// `include`/`import` but produce no output. Templates that render to
    /// nothing but whitespace or a bare `---` are dropped.
    pub fn render_pack(&self, pack: &LoadedPack, context: &TemplateContext) -> Result<RenderResult> {
        let template_files = pack.template_files()?;

        let mut env = self.create_environment();
        let mut sources: BTreeMap<String, String> = BTreeMap::new();

        for file_path in &template_files {
            let template_name = template_name(&pack.templates_dir, file_path);
            let content = std::fs::read_to_string(file_path)?;

            env.add_template_owned(template_name.clone(), content.clone())
                .map_err(|e| TemplateError::from_minijinja(e, &template_name, &content, None))?;
            sources.insert(template_name, content);
        }

        let ctx = Self::render_context(context);
        let mut result = RenderResult::default();

        for (template_name, content) in &sources {
            if is_helper(template_name) {
                continue;
            }

            let tmpl = env
                .get_template(template_name)
                .map_err(|e| TemplateError::from_minijinja(e, template_name, content, None))?;

            let rendered = tmpl.render(&ctx).map_err(|e| {
                TemplateError::from_minijinja(e, template_name, content, Some(&context.values))
            })?;

            if is_notes(template_name) {
                result.notes = Some(rendered);
                continue;
            }

            let trimmed = rendered.trim();
            if trimmed.is_empty() || trimmed == "---" {
                debug!(template = %template_name, "template rendered empty, skipping");
                continue;
            }

            let output_name = template_name
                .trim_end_matches(".j2")
                .trim_end_matches(".jinja2")
                .to_string();
            debug!(template = %output_name, bytes = rendered.len(), "rendered template");
            result.manifests.insert(output_name, rendered);
        }

        Ok(result)
    }
}

/// Template name relative to the templates directory, always `/`-separated
fn template_name(templates_dir: &Path, file_path: &Path) -> String {
    file_path
        .strip_prefix(templates_dir)
        .unwrap_or(file_path)
        .to_string_lossy()
        .replace('\\', "/")
}

fn file_name(template_name: &str) -> &str {
    template_name.rsplit('/').next().unwrap_or(template_name)
}

fn is_helper(template_name: &str) -> bool {
    file_name(template_name).starts_with('_')
}

fn is_notes(template_name: &str) -> bool {
    let name = file_name(template_name);
    let stem = name.split('.').next().unwrap_or(name);
    stem.eq_ignore_ascii_case("notes")
}
