use crate::config::ParserConfig;
use crate::directives::general_info::GeneralInfoProcessor;
use crate::directives::operation::OperationProcessor;
use crate::directives::HttpMethod;
use crate::openapi::{Document, Operation, PathItem};
use crate::resources::ContentStore;
use crate::schema_generator::SchemaGenerator;
use crate::syntax::SourceFile;
use crate::type_resolver::{TypeInfo, TypeResolver};
use anyhow::Result;
use log::{debug, info, trace};
use std::path::{Path, PathBuf};

/// OpenAPI document builder.
///
/// Walks parsed Go files and fills one [`Document`]: the general-info file
/// feeds the document-level directives, every function doc comment may
/// become an operation, and every struct type becomes a component schema.
pub struct OpenApiBuilder {
    document: Document,
    schema_gen: SchemaGenerator,
    content: ContentStore,
    config: ParserConfig,
    /// The one file whose comments feed the general-info directives
    general_info_file: Option<PathBuf>,
}

impl OpenApiBuilder {
    /// Creates a builder, loading markdown and code examples from the
    /// configured directories and overrides from the configured file.
    pub fn new(config: ParserConfig) -> Result<Self> {
        let content = ContentStore::load(
            config.markdown_files_dir.as_deref(),
            config.code_example_files_dir.as_deref(),
        )?;
        Ok(Self::with_content(config, content))
    }

    /// Creates a builder around an already-loaded content store.
    pub fn with_content(config: ParserConfig, content: ContentStore) -> Self {
        debug!("Initializing OpenApiBuilder");
        let resolver = TypeResolver::new(config.overrides(), config.max_depth);
        let schema_gen = SchemaGenerator::new(resolver, config.property_strategy, config.required_by_default);
        Self {
            document: Document::new(),
            schema_gen,
            content,
            config,
            general_info_file: None,
        }
    }

    /// Adds every file in order.
    pub fn add_files(&mut self, files: &[SourceFile]) {
        for file in files {
            self.add_file(file);
        }
    }

    /// Adds one parsed file: general info (if this is the general-info
    /// file), operations, then struct schemas.
    pub fn add_file(&mut self, file: &SourceFile) {
        debug!("Adding file: {}", file.path.display());

        if self.is_general_info_file(file) {
            info!("Reading general API info from {}", file.path.display());
            let mut processor = GeneralInfoProcessor::new(&mut self.document);
            for group in &file.comments {
                processor.process_all(group.directives());
            }
        }

        self.add_operations(file);
        self.add_schemas(file);
    }

    /// Claims the general-info slot on first match. Later files never
    /// replace it.
    fn is_general_info_file(&mut self, file: &SourceFile) -> bool {
        if let Some(current) = &self.general_info_file {
            return current == &file.path;
        }

        let matches = match &self.config.general_info_file {
            Some(configured) => same_file(configured, &file.path),
            None => file.has_general_info(),
        };
        if matches {
            self.general_info_file = Some(file.path.clone());
        }
        matches
    }

    fn add_operations(&mut self, file: &SourceFile) {
        let processor = OperationProcessor::new(
            self.schema_gen.type_resolver(),
            &self.content,
            &self.config.collection_format,
        );

        for func in &file.funcs {
            let Some(mut operation) = processor.process(&func.doc) else {
                continue;
            };

            if self.config.parse_func_body {
                for group in &func.body_comments {
                    processor.process_into(group, &mut operation);
                }
            }

            if !self.config.should_include_operation(&operation.tags) {
                debug!("Skipping {}: filtered out by tags", func.name);
                continue;
            }

            if !self.config.should_include_extensions(operation.extensions.keys()) {
                debug!("Skipping {}: no matching extension", func.name);
                continue;
            }

            let Some(route) = processor.route_info(&func.doc) else {
                trace!("Skipping {}: no @Router", func.name);
                continue;
            };

            debug!("Adding operation: {} {} ({})", route.method, route.path, func.name);
            let item = self.document.paths.entry(route.path).or_default();
            place_operation(item, route.method, operation);
        }
    }

    /// Registers struct types under their simple name and, outside
    /// `package main`, also under `pkg.Name`.
    fn add_schemas(&mut self, file: &SourceFile) {
        for decl in &file.types {
            let Some(schema) = self.schema_gen.generate_type_schema(decl) else {
                continue;
            };

            let mut names = vec![decl.name.clone()];
            if !file.package.is_empty() && file.package != "main" {
                names.push(format!("{}.{}", file.package, decl.name));
            }

            for name in names {
                debug!("Registering schema: {}", name);
                self.document.components.schemas.insert(name.clone(), schema.clone());
                self.schema_gen.type_resolver_mut().register(TypeInfo {
                    name,
                    package: file.package.clone(),
                    schema: schema.clone(),
                    source: file.path.clone(),
                    line: decl.line,
                });
            }
        }
    }

    /// The document built so far.
    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn type_resolver(&self) -> &TypeResolver {
        self.schema_gen.type_resolver()
    }

    /// File the general-info block was read from, if any.
    pub fn general_info_file(&self) -> Option<&Path> {
        self.general_info_file.as_deref()
    }

    /// Build the final OpenAPI document
    pub fn build(self) -> Document {
        debug!(
            "Building final OpenAPI document: {} paths, {} schemas",
            self.document.paths.len(),
            self.document.components.schemas.len()
        );
        self.document
    }
}

fn place_operation(item: &mut PathItem, method: HttpMethod, operation: Operation) {
    let slot = match method {
        HttpMethod::Get => &mut item.get,
        HttpMethod::Post => &mut item.post,
        HttpMethod::Put => &mut item.put,
        HttpMethod::Delete => &mut item.delete,
        HttpMethod::Patch => &mut item.patch,
        HttpMethod::Options => &mut item.options,
        HttpMethod::Head => &mut item.head,
        HttpMethod::Trace => &mut item.trace,
    };
    *slot = Some(operation);
}

/// Compares a configured path against a scanned one, tolerating the
/// configured path being relative.
fn same_file(configured: &Path, scanned: &Path) -> bool {
    scanned == configured || scanned.ends_with(configured)
}
