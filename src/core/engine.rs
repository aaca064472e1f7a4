use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::Config;
use super::{
    FileLocation, FrameGrammar, FrameResolver, JobRecord, ManifestSymbolSource, ModuleIdentity,
    PageRenderer, RenderOptions, Renderer, StackFrame, SuffixGrammar, SymbolCache, SymbolSource,
    TypeDescriptor,
};

const CONFIG_FILE: &str = "stackmark.toml";

/// Classification of one input line, as printed by `stackmark parse`
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParsedLine {
    Frame {
        line: usize,
        frame: StackFrame,
        #[serde(skip_serializing_if = "Option::is_none")]
        location: Option<FileLocation>,
    },
    Text {
        line: usize,
        text: String,
    },
}

/// What to render and where to put it
#[derive(Debug, Default)]
pub struct RenderRequest {
    pub trace: Option<PathBuf>,
    pub job: Option<PathBuf>,
    pub culture: Option<String>,
    pub output: Option<PathBuf>,
    pub standalone: bool,
}

/// Main orchestration engine: owns the configuration and the shared symbol cache
pub struct Engine {
    config: Config,
    cache: Arc<SymbolCache>,
    source: Arc<dyn SymbolSource>,
    pages: PageRenderer,
}

impl Engine {
    /// Create a new engine, indexing symbol manifests and loading the entry modules
    pub async fn new(config_path: Option<&Path>) -> Result<Self> {
        let config = Config::load_or_default(config_path).context("Failed to load configuration")?;
        debug!("Loaded configuration: {:?}", config);

        Self::with_config(config)
    }

    pub fn with_config(config: Config) -> Result<Self> {
        let source = ManifestSymbolSource::from_dirs(&config.symbols.manifest_dirs)
            .context("Failed to index symbol manifests")?;
        if source.is_empty() {
            warn!("No symbol manifests found, frames will render unresolved");
        } else {
            debug!("Symbol manifests available for: {:?}", source.module_names());
        }

        Self::with_source(config, Arc::new(source))
    }

    pub fn with_source(config: Config, source: Arc<dyn SymbolSource>) -> Result<Self> {
        let cache = Arc::new(SymbolCache::new());

        for module in &config.symbols.entry_modules {
            if !cache.load_by_identity(source.as_ref(), &ModuleIdentity::named(module.as_str())) {
                warn!("Entry module {} could not be loaded", module);
            }
        }
        info!(
            modules = cache.module_count(),
            types = cache.type_count(),
            "Symbol cache ready"
        );

        let pages = PageRenderer::new().context("Failed to compile page template")?;

        Ok(Self {
            config,
            cache,
            source,
            pages,
        })
    }

    fn renderer(&self, culture: Option<&str>) -> Renderer {
        Renderer::new(
            self.config.markers_for(culture),
            RenderOptions::from(self.config.render.clone()),
        )
    }

    /// Render raw trace text with the markers of `culture`
    pub fn render_trace(&self, text: &str, culture: Option<&str>) -> Result<String> {
        let resolver = FrameResolver::new(&self.cache);
        let html = self
            .renderer(culture)
            .render(text, Some(&resolver))
            .context("Failed to render stack trace")?;
        Ok(html)
    }

    /// Render a failed job; `culture` overrides the one the job recorded
    pub fn render_job(&self, job: &JobRecord, culture: Option<&str>) -> Result<String> {
        if let Some(module) = &job.job_module {
            if !self.cache.load_by_identity(self.source.as_ref(), &ModuleIdentity::named(module.as_str())) {
                debug!("Job module {} is not available, rendering without it", module);
            }
        }

        let resolver = FrameResolver::new(&self.cache);
        let html = self
            .renderer(culture.or(job.marker_culture()))
            .render_failed_state(job, Some(&resolver))
            .with_context(|| format!("Failed to render failed state of {}", job.exception_type))?;
        Ok(html)
    }

    /// Classify every line of `text` without touching the symbol cache
    pub fn parse_trace(&self, text: &str, culture: Option<&str>) -> Vec<ParsedLine> {
        let markers = self.config.markers_for(culture);
        let grammar = FrameGrammar::new(markers.lead_in.as_deref());
        let suffixes = SuffixGrammar::new(markers.file_line_template.as_deref());

        text.lines()
            .enumerate()
            .map(|(index, line)| match grammar.parse(line) {
                Some(frame) => ParsedLine::Frame {
                    line: index + 1,
                    location: suffixes.parse(&frame.suffix),
                    frame,
                },
                None => ParsedLine::Text {
                    line: index + 1,
                    text: line.to_string(),
                },
            })
            .collect()
    }

    pub fn lookup(&self, type_name: &str) -> Option<Arc<TypeDescriptor>> {
        self.cache.lookup(type_name)
    }

    // CLI commands

    pub async fn init(&self, path: Option<PathBuf>) -> Result<()> {
        let target_dir = match path {
            Some(path) => path,
            None => std::env::current_dir().context("Failed to determine current directory")?,
        };
        info!("Initializing Stackmark in: {}", target_dir.display());

        let config_path = target_dir.join(CONFIG_FILE);
        if tokio::fs::try_exists(&config_path).await.unwrap_or(false) {
            warn!("{} already exists, leaving it untouched", config_path.display());
            return Ok(());
        }

        tokio::fs::create_dir_all(target_dir.join("symbols"))
            .await
            .with_context(|| format!("Failed to create {}", target_dir.display()))?;
        Config::default()
            .save(&config_path)
            .with_context(|| format!("Failed to write {}", config_path.display()))?;

        info!("Wrote {}", config_path.display());
        Ok(())
    }

    /// Render a trace file or a job record to markup
    pub async fn render_document(&self, request: &RenderRequest) -> Result<String> {
        let culture = request.culture.as_deref();

        let (body, job) = match (&request.job, &request.trace) {
            (Some(path), _) => {
                let job = JobRecord::load(path)
                    .with_context(|| format!("Failed to read job record {}", path.display()))?;
                (self.render_job(&job, culture)?, Some(job))
            }
            (None, Some(path)) => {
                let text = read_text(path).await?;
                (self.render_trace(&text, culture)?, None)
            }
            (None, None) => bail!("Nothing to render: pass a trace file or --job"),
        };

        if !(request.standalone || self.config.output.standalone) {
            return Ok(body);
        }

        let title = job
            .as_ref()
            .map(|job| job.exception_type.as_str())
            .unwrap_or("Stack trace");
        let page = self
            .pages
            .render(title, &body, job.as_ref().and_then(|job| job.failed_at))
            .context("Failed to render page")?;
        Ok(page)
    }

    pub async fn render(&self, request: RenderRequest) -> Result<()> {
        let html = self.render_document(&request).await?;

        match &request.output {
            Some(path) => {
                tokio::fs::write(path, &html)
                    .await
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                info!("Wrote {} bytes to {}", html.len(), path.display());
            }
            None => print!("{}", html),
        }

        Ok(())
    }

    pub async fn parse(&self, trace: &Path, culture: Option<&str>) -> Result<()> {
        let text = read_text(trace).await?;
        let lines = self.parse_trace(&text, culture);

        let frames = lines
            .iter()
            .filter(|line| matches!(line, ParsedLine::Frame { .. }))
            .count();
        debug!("{} of {} lines are frames", frames, lines.len());

        println!("{}", serde_json::to_string_pretty(&lines)?);
        Ok(())
    }

    pub async fn inspect(&self, type_name: &str) -> Result<()> {
        let Some(descriptor) = self.lookup(type_name) else {
            bail!(
                "Type {} not found in symbol cache ({} modules loaded)",
                type_name,
                self.cache.module_count()
            );
        };

        println!("{}", serde_json::to_string_pretty(descriptor.as_ref())?);
        Ok(())
    }
}

async fn read_text(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))
}
