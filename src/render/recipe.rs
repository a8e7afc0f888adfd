//! Processing recipe: everything one renderer invocation needs

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::RenderError;

/// Renderer output format (transtype)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Classic XSL-FO pipeline
    #[default]
    #[serde(rename = "pdf")]
    Pdf,
    /// CSS paged-media pipeline
    #[serde(rename = "pdf-css-html5")]
    PdfCssHtml5,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::PdfCssHtml5 => "pdf-css-html5",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "pdf" => Ok(Self::Pdf),
            "pdf-css-html5" => Ok(Self::PdfCssHtml5),
            other => Err(RenderError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Validated parameters of one renderer invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingRecipe {
    executable: PathBuf,
    dita_map: PathBuf,
    output_dir: PathBuf,
    tmp_dir: PathBuf,
    format: OutputFormat,
    style: Option<PathBuf>,
    verbose: bool,
}

impl ProcessingRecipe {
    pub fn builder() -> ProcessingRecipeBuilder {
        ProcessingRecipeBuilder::default()
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    pub fn dita_map(&self) -> &Path {
        &self.dita_map
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn tmp_dir(&self) -> &Path {
        &self.tmp_dir
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn style(&self) -> Option<&Path> {
        self.style.as_deref()
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    /// Renderer arguments, one argv entry each
    pub fn args(&self) -> Vec<OsString> {
        let mut args = vec![
            flag("--input=", self.dita_map.as_os_str()),
            flag("--format=", self.format.as_str().as_ref()),
            flag("--output=", self.output_dir.as_os_str()),
            flag("--temp=", self.tmp_dir.as_os_str()),
        ];

        if let Some(style) = &self.style {
            args.push(flag("--args.css=", style.as_os_str()));
        }

        if self.verbose {
            args.push(OsString::from("-v"));
        }

        args
    }
}

fn flag(name: &str, value: &std::ffi::OsStr) -> OsString {
    let mut arg = OsString::from(name);
    arg.push(value);
    arg
}

/// Builder for [`ProcessingRecipe`]
#[derive(Debug, Default, Clone)]
pub struct ProcessingRecipeBuilder {
    executable: Option<PathBuf>,
    dita_map: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    tmp_dir: Option<PathBuf>,
    format: Option<String>,
    style: Option<PathBuf>,
    verbose: bool,
}

impl ProcessingRecipeBuilder {
    pub fn executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.executable = Some(path.into());
        self
    }

    pub fn dita_map(mut self, path: impl Into<PathBuf>) -> Self {
        self.dita_map = Some(path.into());
        self
    }

    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(path.into());
        self
    }

    pub fn tmp_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.tmp_dir = Some(path.into());
        self
    }

    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    /// Stylesheet handed to the renderer; an empty path means none
    pub fn style(mut self, style: Option<impl Into<PathBuf>>) -> Self {
        self.style = style.map(Into::into);
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn build(self) -> Result<ProcessingRecipe, RenderError> {
        let executable = required(self.executable, "executable")?;
        let tmp_dir = required(self.tmp_dir, "tmp_dir")?;
        let dita_map = required(self.dita_map, "dita_map")?;
        let output_dir = required(self.output_dir, "output_dir")?;

        let format = match self.format.as_deref().map(str::trim) {
            None | Some("") => {
                return Err(RenderError::InvalidRecipe("format is required".to_string()))
            }
            Some(format) => format.parse()?,
        };

        Ok(ProcessingRecipe {
            executable,
            dita_map,
            output_dir,
            tmp_dir,
            format,
            style: self.style.filter(|s| !s.as_os_str().is_empty()),
            verbose: self.verbose,
        })
    }
}

fn required(value: Option<PathBuf>, name: &str) -> Result<PathBuf, RenderError> {
    value
        .filter(|p| !p.as_os_str().is_empty())
        .ok_or_else(|| RenderError::InvalidRecipe(format!("{} is required", name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> ProcessingRecipeBuilder {
        ProcessingRecipe::builder()
            .executable("/opt/dita/bin/dita")
            .dita_map("/work/input/flowers/flowers.ditamap")
            .output_dir("/work/output")
            .tmp_dir("/work/tmp")
            .format("pdf")
    }

    #[test]
    fn test_build_complete() {
        let recipe = complete().build().unwrap();

        assert_eq!(recipe.executable(), Path::new("/opt/dita/bin/dita"));
        assert_eq!(recipe.format(), OutputFormat::Pdf);
        assert_eq!(recipe.style(), None);
        assert!(!recipe.verbose());
    }

    #[test]
    fn test_args_minimal() {
        let recipe = complete().build().unwrap();

        assert_eq!(
            recipe.args(),
            vec![
                OsString::from("--input=/work/input/flowers/flowers.ditamap"),
                OsString::from("--format=pdf"),
                OsString::from("--output=/work/output"),
                OsString::from("--temp=/work/tmp"),
            ]
        );
    }

    #[test]
    fn test_args_with_style_and_verbose() {
        let recipe = complete()
            .format("pdf-css-html5")
            .style(Some("/work/input/custom/main.css"))
            .verbose(true)
            .build()
            .unwrap();

        let args = recipe.args();
        assert_eq!(args[1], OsString::from("--format=pdf-css-html5"));
        assert_eq!(args[4], OsString::from("--args.css=/work/input/custom/main.css"));
        assert_eq!(args[5], OsString::from("-v"));
        assert_eq!(args.len(), 6);
    }

    #[test]
    fn test_paths_with_spaces_stay_single_args() {
        let recipe = complete()
            .dita_map("/work/input/my book/book.ditamap")
            .build()
            .unwrap();

        assert_eq!(
            recipe.args()[0],
            OsString::from("--input=/work/input/my book/book.ditamap")
        );
    }

    #[test]
    fn test_empty_style_is_absent() {
        let recipe = complete().style(Some("")).build().unwrap();
        assert_eq!(recipe.style(), None);
        assert_eq!(recipe.args().len(), 4);
    }

    #[test]
    fn test_missing_fields() {
        let cases = [
            ProcessingRecipe::builder()
                .dita_map("a.ditamap")
                .output_dir("out")
                .tmp_dir("tmp")
                .format("pdf"),
            complete().executable(""),
            complete().dita_map(""),
            complete().output_dir(""),
            complete().tmp_dir(""),
            complete().format(""),
        ];

        for builder in cases {
            assert!(matches!(
                builder.build(),
                Err(RenderError::InvalidRecipe(_))
            ));
        }
    }

    #[test]
    fn test_unsupported_format() {
        match complete().format("html5").build() {
            Err(RenderError::UnsupportedFormat(format)) => assert_eq!(format, "html5"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!("pdf".parse::<OutputFormat>().unwrap(), OutputFormat::Pdf);
        assert_eq!(
            " pdf-css-html5 ".parse::<OutputFormat>().unwrap(),
            OutputFormat::PdfCssHtml5
        );
        assert!("PDF".parse::<OutputFormat>().is_err());
        assert_eq!(OutputFormat::PdfCssHtml5.to_string(), "pdf-css-html5");
    }
}
