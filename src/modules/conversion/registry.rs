use std::collections::HashMap;
use std::path::Path;
use std::process::Command;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("converter process failed: {0}")]
    Tool(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Closed set of target formats. Unknown output extensions are rejected
/// at the dispatch boundary instead of deep in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    Docx,
    Pptx,
}

impl OutputFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "docx" => Some(OutputFormat::Docx),
            "pptx" => Some(OutputFormat::Pptx),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Docx => "docx",
            OutputFormat::Pptx => "pptx",
        }
    }
}

pub type ConvertFn = Box<dyn Fn(&Path, &Path) -> Result<(), ConversionError> + Send + Sync>;

pub struct ConversionTask {
    pub convert: ConvertFn,
    pub content_type: &'static str,
}

/// Maps output format → converter + MIME type. Built once at startup,
/// read-only afterwards.
pub struct ConversionRegistry {
    tasks: HashMap<OutputFormat, ConversionTask>,
}

impl ConversionRegistry {
    pub fn new() -> Self {
        Self {
            tasks: HashMap::new(),
        }
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::new();

        registry.register(
            OutputFormat::Docx,
            ConversionTask {
                convert: Box::new(|input, output| convert_with_soffice(input, output, "docx")),
                content_type:
                    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            },
        );

        registry.register(
            OutputFormat::Pptx,
            ConversionTask {
                convert: Box::new(|input, output| convert_with_soffice(input, output, "pptx")),
                content_type:
                    "application/vnd.openxmlformats-officedocument.presentationml.presentation",
            },
        );

        registry
    }

    pub fn register(&mut self, format: OutputFormat, task: ConversionTask) {
        self.tasks.insert(format, task);
    }

    pub fn lookup(&self, format: OutputFormat) -> Option<&ConversionTask> {
        self.tasks.get(&format)
    }
}

fn convert_with_soffice(
    input: &Path,
    output: &Path,
    target: &str,
) -> Result<(), ConversionError> {
    info!("🔄 Converting {} to {}", input.display(), target);

    let outdir = output.parent().unwrap_or_else(|| Path::new("."));

    let status = Command::new("soffice")
        .args(["--headless", "--norestore", "--convert-to", target, "--outdir"])
        .arg(outdir)
        .arg(input)
        .status()?;

    if !status.success() {
        return Err(ConversionError::Tool(format!(
            "soffice exited with {}",
            status
        )));
    }

    // soffice names the result after the input stem; move it to the
    // path the caller asked for.
    let produced = outdir
        .join(input.file_stem().unwrap_or_default())
        .with_extension(target);
    if produced != output {
        std::fs::rename(&produced, output)?;
    }

    Ok(())
}
