use crate::config::{to_valid_collection_format, ParserConfig};
use crate::naming::PropertyStrategy;
use crate::openapi_builder::OpenApiBuilder;
use crate::parser::AstParser;
use crate::scanner::FileScanner;
use crate::serializer::{serialize_json, serialize_yaml, write_to_file};
use crate::syntax::SourceFile;
use crate::validator;
use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use log::{debug, info, warn};
use std::path::PathBuf;

/// Generate an OpenAPI 3.1 document from @Directive comments in Go source code
#[derive(Parser, Debug)]
#[command(name = "openapi-from-comments")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Directory to search for Go files
    #[arg(short = 'd', long = "dir", value_name = "DIR", default_value = "./")]
    pub search_dir: PathBuf,

    /// File holding the general API info (@title, @version, ...); auto-detected when omitted
    #[arg(short = 'g', long = "general-info", value_name = "FILE")]
    pub general_info: Option<PathBuf>,

    /// Comma-separated directories or files to exclude, relative to --dir
    #[arg(long = "exclude", value_name = "PATHS", value_delimiter = ',')]
    pub exclude: Vec<String>,

    /// Output file path (if not specified, outputs to stdout)
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output_path: Option<PathBuf>,

    /// Output format (yaml or json)
    #[arg(short = 'f', long = "format", value_enum, default_value = "yaml")]
    pub output_format: OutputFormat,

    /// Property naming strategy for fields without a json tag name
    #[arg(short = 'p', long = "property-strategy", value_enum, default_value = "camelcase")]
    pub property_strategy: StrategyArg,

    /// Mark fields required unless omitempty or a pointer
    #[arg(long = "required-by-default")]
    pub required_by_default: bool,

    /// Also scan internal/ packages
    #[arg(long = "parse-internal")]
    pub parse_internal: bool,

    /// Also read directives from comments inside function bodies
    #[arg(long = "parse-func-body")]
    pub parse_func_body: bool,

    /// Directory of markdown files referenced by @Description file(name)
    #[arg(long = "markdown-files", value_name = "DIR")]
    pub markdown_files: Option<PathBuf>,

    /// Directory of code examples referenced by @x-codeSamples
    #[arg(long = "code-example-files", value_name = "DIR")]
    pub code_example_files: Option<PathBuf>,

    /// JSON file of type overrides: {"replace": {"<Type>": "<override>"}}
    #[arg(long = "overrides-file", value_name = "FILE")]
    pub overrides_file: Option<PathBuf>,

    /// Tag filter, e.g. "users,!internal"
    #[arg(short = 't', long = "tags", value_name = "TAGS")]
    pub tags: Option<String>,

    /// Only keep operations with an extension key starting with this prefix
    #[arg(long = "parse-extension", value_name = "PREFIX")]
    pub parse_extension: Option<String>,

    /// Type nesting depth limit (0 = unlimited)
    #[arg(long = "parse-depth", default_value_t = 100)]
    pub parse_depth: usize,

    /// Default collection format for array parameters (csv, multi, pipes, tsv, ssv)
    #[arg(long = "collection-format", default_value = "csv")]
    pub collection_format: String,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

/// Output format options
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// YAML format
    Yaml,
    /// JSON format
    Json,
}

/// Property naming strategies accepted on the command line
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StrategyArg {
    #[value(name = "snakecase", alias = "snake")]
    Snake,
    #[value(name = "camelcase", alias = "camel")]
    Camel,
    #[value(name = "pascalcase", alias = "pascal")]
    Pascal,
}

impl From<StrategyArg> for PropertyStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Snake => PropertyStrategy::Snake,
            StrategyArg::Camel => PropertyStrategy::Camel,
            StrategyArg::Pascal => PropertyStrategy::Pascal,
        }
    }
}

impl CliArgs {
    /// Maps the flags onto a generator configuration.
    pub fn to_config(&self) -> ParserConfig {
        let mut config = ParserConfig::new()
            .with_property_strategy(self.property_strategy.into())
            .with_required_by_default(self.required_by_default)
            .with_parse_internal(self.parse_internal)
            .with_parse_func_body(self.parse_func_body)
            .with_max_depth(self.parse_depth)
            .with_collection_format(&self.collection_format)
            .with_exclude_patterns(self.exclude.clone());

        if let Some(dir) = &self.markdown_files {
            config = config.with_markdown_files_dir(dir);
        }
        if let Some(dir) = &self.code_example_files {
            config = config.with_code_example_files_dir(dir);
        }
        if let Some(path) = &self.overrides_file {
            config = config.with_overrides_file(path);
        }
        if let Some(tags) = &self.tags {
            config = config.with_tags(tags);
        }
        if let Some(prefix) = &self.parse_extension {
            config = config.with_parse_extension(prefix);
        }
        if let Some(path) = &self.general_info {
            config = config.with_general_info_file(path);
        }
        config
    }
}

/// Parse command line arguments
pub fn parse_args() -> Result<CliArgs> {
    let args = CliArgs::parse();
    parse_args_from_parsed(args)
}

/// Validate and log already-parsed arguments
pub fn parse_args_from_parsed(args: CliArgs) -> Result<CliArgs> {
    debug!("Parsed arguments: {:?}", args);

    if !args.search_dir.exists() {
        bail!("Search directory does not exist: {}", args.search_dir.display());
    }
    if !args.search_dir.is_dir() {
        bail!("Search directory is not a directory: {}", args.search_dir.display());
    }

    let normalized = to_valid_collection_format(&args.collection_format);
    if normalized != args.collection_format.to_lowercase() {
        warn!(
            "Unknown collection format '{}', falling back to {}",
            args.collection_format, normalized
        );
    }

    info!("Search directory: {}", args.search_dir.display());
    info!("Output format: {:?}", args.output_format);
    match &args.output_path {
        Some(output) => info!("Output file: {}", output.display()),
        None => info!("Output: stdout"),
    }
    match &args.general_info {
        Some(file) => info!("General info file: {}", file.display()),
        None => info!("General info file: auto-detect"),
    }

    Ok(args)
}

/// Run the main workflow
pub fn run(args: CliArgs) -> Result<()> {
    info!("Starting OpenAPI document generation...");
    let config = args.to_config();

    // Step 1: Scan directory for Go files
    info!("Scanning {}...", args.search_dir.display());
    let scanner = FileScanner::new(args.search_dir.clone())
        .with_parse_internal(config.parse_internal)
        .with_exclude_patterns(config.exclude_patterns.clone());
    let scan_result = scanner.scan()?;

    info!("Found {} Go files", scan_result.go_files.len());
    for warning in &scan_result.warnings {
        warn!("{}", warning);
    }
    if scan_result.go_files.is_empty() {
        bail!("No Go files found in {}", args.search_dir.display());
    }

    // Step 2: Parse files
    info!("Parsing Go files...");
    let parsed_files: Vec<SourceFile> = AstParser::parse_files(&scan_result.go_files)
        .into_iter()
        .filter_map(|r| match r {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                debug!("Skipping file due to parse error: {:#}", e);
                None
            }
        })
        .collect();

    info!("Successfully parsed {} files", parsed_files.len());
    if parsed_files.is_empty() {
        bail!("No files could be parsed successfully");
    }

    // Step 3: Build the document
    info!("Building OpenAPI document...");
    let mut builder = OpenApiBuilder::new(config).context("Failed to load annotation resources")?;
    builder.add_files(&parsed_files);
    match builder.general_info_file() {
        Some(path) => info!("General API info read from {}", path.display()),
        None => warn!("No file with @title or @version found"),
    }
    let document = builder.build();

    // Step 4: Validate references
    info!("Validating document...");
    validator::validate(&document).context("Generated document is invalid")?;

    // Step 5: Serialize to requested format
    info!("Serializing to {:?} format...", args.output_format);
    let content = match args.output_format {
        OutputFormat::Yaml => serialize_yaml(&document)?,
        OutputFormat::Json => serialize_json(&document)?,
    };

    // Step 6: Output to file or stdout
    match &args.output_path {
        Some(output_path) => {
            info!("Writing output to: {}", output_path.display());
            write_to_file(&content, output_path)?;
        }
        None => println!("{}", content),
    }

    info!("Generation complete!");
    info!("Summary:");
    info!("  - Files scanned: {}", scan_result.go_files.len());
    info!("  - Files parsed: {}", parsed_files.len());
    info!("  - Operations: {}", document.operations().count());
    info!("  - Schemas: {}", document.components.schemas.len());

    Ok(())
}
