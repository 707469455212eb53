use crate::{EngineError, RgbaImage};
use image::ImageFormat;
use std::env;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

pub const MIN_DPI: u32 = 36;
pub const MAX_DPI: u32 = 300;

/// Converts a render scale (1.0 = 72 dpi) into the dpi handed to the rasterizer.
pub fn dpi_for_scale(scale: f32) -> u32 {
    let dpi = (72.0 * scale).round();
    if !dpi.is_finite() || dpi < MIN_DPI as f32 {
        MIN_DPI
    } else {
        (dpi as u32).min(MAX_DPI)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BackendRequest<'a> {
    pub path: &'a Path,
    pub page_index: u32,
    pub scale: f32,
    pub password: Option<&'a str>,
}

/// Rasterizer capability. Documents receive one explicitly when they are opened.
pub trait RenderBackend: Send + Sync {
    fn name(&self) -> &str;
    fn can_render(&self) -> bool;
    fn render_page(&self, request: BackendRequest<'_>) -> Result<RgbaImage, EngineError>;
    fn extract_text(&self, request: BackendRequest<'_>) -> Result<String, EngineError>;
}

/// Shells out to poppler's `pdftoppm` and `pdftotext`.
#[derive(Debug, Clone)]
pub struct PopplerBackend {
    pdftoppm: PathBuf,
    pdftotext: PathBuf,
}

impl PopplerBackend {
    pub fn new(pdftoppm: impl Into<PathBuf>, pdftotext: impl Into<PathBuf>) -> Self {
        Self { pdftoppm: pdftoppm.into(), pdftotext: pdftotext.into() }
    }

    /// Looks both tools up on `PATH`. Returns `None` if `pdftoppm` is missing.
    pub fn detect() -> Option<Self> {
        let pdftoppm = find_on_path("pdftoppm")?;
        let pdftotext = find_on_path("pdftotext").unwrap_or_else(|| PathBuf::from("pdftotext"));
        tracing::debug!(pdftoppm = %pdftoppm.display(), "poppler backend detected");
        Some(Self { pdftoppm, pdftotext })
    }

    fn page_args(cmd: &mut Command, request: &BackendRequest<'_>) {
        let page = (request.page_index + 1).to_string();
        cmd.arg("-f").arg(&page).arg("-l").arg(&page);
        if let Some(password) = request.password {
            cmd.arg("-upw").arg(password);
        }
    }

    fn run(tool: &Path, mut cmd: Command) -> Result<Output, EngineError> {
        let output = cmd.output()?;
        if output.status.success() {
            return Ok(output);
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(EngineError::Backend(format!(
            "{} exited with {}: {}",
            tool.display(),
            output.status,
            stderr.trim()
        )))
    }
}

impl RenderBackend for PopplerBackend {
    fn name(&self) -> &str {
        "poppler"
    }

    fn can_render(&self) -> bool {
        self.pdftoppm.is_file()
    }

    fn render_page(&self, request: BackendRequest<'_>) -> Result<RgbaImage, EngineError> {
        let mut cmd = Command::new(&self.pdftoppm);
        cmd.arg("-png");
        Self::page_args(&mut cmd, &request);
        cmd.arg("-r").arg(dpi_for_scale(request.scale).to_string()).arg("-singlefile");
        cmd.arg(request.path);

        let output = Self::run(&self.pdftoppm, cmd)?;
        let image = image::load_from_memory_with_format(&output.stdout, ImageFormat::Png)?;
        Ok(image.to_rgba8())
    }

    fn extract_text(&self, request: BackendRequest<'_>) -> Result<String, EngineError> {
        let mut cmd = Command::new(&self.pdftotext);
        Self::page_args(&mut cmd, &request);
        cmd.arg("-layout").arg(request.path).arg("-");

        let output = Self::run(&self.pdftotext, cmd)?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

fn find_on_path(program: &str) -> Option<PathBuf> {
    let paths = env::var_os("PATH")?;
    env::split_paths(&paths).map(|dir| dir.join(program)).find(|candidate| candidate.is_file())
}
