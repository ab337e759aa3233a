//! terraform modules
//!
//! A [ModuleBuilder] collects the blocks of all `.tf` files of one directory and the variable assignments of its
//! `.tfvars` files. [ModuleBuilder::build] evaluates them into a [Module]: blocks with evaluated attributes and the
//! [Scope] their expressions were evaluated in. A [ModuleGraph] is the list of modules handed to the extraction.
//!
//! Each block remembers the file and line it was declared on so diagnostics can point there.
use crate::block::{Attribute, ConfigBlock, Location};
use crate::evaluator;
use crate::scope::{EvalContext, Scope};
use crate::value::Value;
use hcl_edit::structure::{Block, Body, Structure};
use hcl_edit::Span;
use indexmap::IndexMap;
use std::ops::Range;
use std::path::{Path, PathBuf};

pub type Source = Option<PathBuf>;

#[derive(Default, Debug)]
pub struct ModuleBuilder {
    sources: Vec<Source>,
    blocks: Vec<ConfigBlock>,
    tfvars: IndexMap<String, Value>,
}

/// Source text of one document, used to turn byte spans into line numbers
struct SourceText<'a> {
    path: &'a Source,
    text: &'a str,
}

impl SourceText<'_> {
    fn location(&self, span: Option<Range<usize>>) -> Option<Location> {
        let line = span
            .and_then(|span| self.text.get(..span.start))
            .map(|before| before.matches('\n').count() + 1);
        Some(Location::new(self.path.clone(), line))
    }

    fn block(&self, block: &Block) -> ConfigBlock {
        let labels = block
            .labels
            .iter()
            .map(|label| label.as_str().to_string())
            .collect();
        let mut config = ConfigBlock::new(block.ident.value().as_str(), labels);
        config.location = self.location(block.span());

        for structure in block.body.iter() {
            match structure {
                Structure::Attribute(attribute) => {
                    let name = attribute.key.value().as_str().to_string();
                    let mut converted = Attribute::new(name.clone(), attribute.value.clone().into());
                    converted.location = self.location(attribute.span());
                    config.attributes.insert(name, converted);
                }
                Structure::Block(nested) => config.declared.push(self.block(nested)),
            }
        }

        config
    }
}

impl ModuleBuilder {
    /// Parses a `.tf` document and adds its blocks
    pub fn insert(&mut self, document: &str, path: Option<PathBuf>) -> Result<(), LoadError> {
        let body = hcl_edit::parser::parse_body(document)?;
        self.insert_body(&body, document, path);
        Ok(())
    }

    fn insert_body(&mut self, body: &Body, document: &str, path: Source) {
        self.sources.push(path);
        let source = SourceText {
            path: &self.sources[self.sources.len() - 1],
            text: document,
        };

        for structure in body.iter() {
            match structure {
                Structure::Block(block) => {
                    let mut block = source.block(block);
                    // instances of counted blocks are not materialized
                    if block.attributes.contains_key("count") {
                        block.locals.insert("count".to_string(), Value::Unknown);
                    }
                    if block.attributes.contains_key("for_each") {
                        block.locals.insert("each".to_string(), Value::Unknown);
                    }
                    self.blocks.push(block);
                }
                Structure::Attribute(attribute) => {
                    tracing::debug!(key = attribute.key.value().as_str(), "ignoring root attribute");
                }
            }
        }
    }

    /// Parses a `.tfvars` document and records its variable assignments
    ///
    /// Later assignments of the same variable win.
    pub fn insert_tfvars(&mut self, document: &str) -> Result<(), LoadError> {
        let body = hcl_edit::parser::parse_body(document)?;
        let scope = Scope::new();
        let locals = IndexMap::new();
        let context = EvalContext::new(&scope, &locals);

        for attribute in body.attributes() {
            let name = attribute.key.value().as_str();
            let expression: hcl::Expression = attribute.value.clone().into();
            match context.evaluate(&expression) {
                Ok(value) => {
                    self.tfvars.insert(name.to_string(), value);
                }
                Err(err) => {
                    tracing::warn!(variable = name, %err, "ignoring invalid variable assignment");
                }
            }
        }

        Ok(())
    }

    pub fn load_file(&mut self, file_path: &Path) -> Result<(), LoadError> {
        let file_path = file_path.canonicalize()?;
        tracing::info!(path=%file_path.display(), "loading file");

        let file_contents = std::fs::read_to_string(&file_path)?;
        if file_path.extension().is_some_and(|ext| ext == "tfvars") {
            return self.insert_tfvars(&file_contents);
        }
        self.insert(&file_contents, Some(file_path))
    }

    /// Loads all `*.tf` and `*.tfvars` files of a directory in file name order
    pub fn load_directory(&mut self, dir_path: &Path) -> Result<(), LoadError> {
        let mut file_paths = vec![];
        for dir_entry in std::fs::read_dir(dir_path)? {
            let dir_entry = dir_entry?;
            if !dir_entry.file_type()?.is_file() {
                continue;
            }

            let file_path = dir_entry.path();
            let is_terraform_file = file_path
                .extension()
                .is_some_and(|ext| ext == "tf" || ext == "tfvars");
            if is_terraform_file {
                file_paths.push(file_path);
            }
        }

        if !file_paths.iter().any(|path| path.extension().is_some_and(|ext| ext == "tf")) {
            return Err(LoadError::NoFilesFound(dir_path.to_path_buf()));
        }

        // configuration before variable assignments, each in name order
        file_paths.sort_by_key(|path| (path.extension().is_some_and(|ext| ext == "tfvars"), path.clone()));
        for file_path in &file_paths {
            self.load_file(file_path)?;
        }

        Ok(())
    }

    /// Evaluates all blocks
    pub fn build(self) -> Module {
        let (blocks, scope) = evaluator::evaluate_module(self.blocks, &self.tfvars);
        Module {
            sources: self.sources,
            blocks,
            scope,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("No terraform files found in {}", .0.display())]
    NoFilesFound(PathBuf),
    #[error("IO error")]
    IoError(#[from] std::io::Error),
    #[error("Unable to parse hcl file")]
    HclParseFailed(#[from] hcl_edit::parser::Error),
}

/// Evaluated blocks of one directory
#[derive(Debug, Clone)]
pub struct Module {
    sources: Vec<Source>,
    blocks: Vec<ConfigBlock>,
    scope: Scope,
}

impl Module {
    pub fn load_directory(dir_path: &Path) -> Result<Module, LoadError> {
        let mut builder = ModuleBuilder::default();
        builder.load_directory(dir_path)?;
        Ok(builder.build())
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn blocks(&self) -> &[ConfigBlock] {
        &self.blocks
    }

    /// Root blocks of `kind` whose type label is `type_label`, e.g. `data` / `coder_parameter`
    pub fn blocks_of<'a>(
        &'a self,
        kind: &'a str,
        type_label: &'a str,
    ) -> impl Iterator<Item = &'a ConfigBlock> + 'a {
        self.blocks
            .iter()
            .filter(move |block| block.kind == kind && block.type_label() == type_label)
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Blocks and scope borrowed separately, so values can be written to the scope while iterating blocks
    pub fn parts_mut(&mut self) -> (&[ConfigBlock], &mut Scope) {
        (&self.blocks, &mut self.scope)
    }
}

/// All modules taking part in one extraction
#[derive(Debug, Clone, Default)]
pub struct ModuleGraph {
    modules: Vec<Module>,
}

impl ModuleGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, module: Module) {
        self.modules.push(module);
    }

    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    pub fn modules_mut(&mut self) -> &mut [Module] {
        &mut self.modules
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl From<Module> for ModuleGraph {
    fn from(module: Module) -> Self {
        Self {
            modules: vec![module],
        }
    }
}

impl FromIterator<Module> for ModuleGraph {
    fn from_iter<T: IntoIterator<Item = Module>>(iter: T) -> Self {
        Self {
            modules: iter.into_iter().collect(),
        }
    }
}

/// Utility macro to create a single module [ModuleGraph]
///
/// Create from a single document
/// ```
/// # use coderism::module_graph;
/// module_graph!(r#"variable "region" { default = "eu" }"#);
/// ```
///
/// Create from multiple documents (path required)
/// ```
/// # use coderism::module_graph;
/// module_graph! {
///   "variables.tf" => r#"variable "region" { default = "eu" }"#,
///   "main.tf" => r#"locals { region = var.region }"#
/// };
/// ```
///
/// # Panic
/// Panics on invalid input
///
/// ```should_panic
/// # use coderism::module_graph;
/// module_graph!("not = valid = hcl");
/// ```
#[macro_export]
macro_rules! module_graph {
    // single document without source
    { $expr:expr } => {{
        let mut builder = $crate::module::ModuleBuilder::default();
        builder.insert($expr, None).expect("module must parse");
        $crate::module::ModuleGraph::from(builder.build())
    }};
    // multi document with sources
    { $($source:expr => $expr:expr),+ } => {{
        let mut builder = $crate::module::ModuleBuilder::default();
        $(
            builder.insert($expr, Some($source.into())).expect("module must parse");
        )+
        $crate::module::ModuleGraph::from(builder.build())
    }};
}
