/// Interpreter settings. The defaults reproduce the original machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Arena capacity in cells.
    pub workspace_size: usize,
    /// Collect before an evaluation step once free cells drop below this.
    pub gc_threshold: usize,
    /// Echo consumed input characters to the output.
    pub echo: bool,
    /// Print the free-cell count before each prompt.
    pub show_freespace: bool,
    /// Print the startup banner.
    pub banner: bool,
}

pub const BANNER: &str = "ULISP ZERO 1.1";

impl Default for Config {
    fn default() -> Self {
        Config {
            workspace_size: 1000,
            gc_threshold: 20,
            echo: false,
            show_freespace: true,
            banner: true,
        }
    }
}

impl Config {
    /// Defaults overridden by `ULISP_WORKSPACE` and `ULISP_ECHO`.
    pub fn from_env() -> Result<Self, String> {
        let mut config = Config::default();
        if let Ok(v) = std::env::var("ULISP_WORKSPACE") {
            config.set_workspace(&v)?;
        }
        if let Ok(v) = std::env::var("ULISP_ECHO") {
            config.echo = v == "1";
        }
        Ok(config)
    }

    /// Parse and validate an arena size. It must leave room above the
    /// collection threshold for at least one evaluation step, and every
    /// cell must be addressable by a 32-bit cell id.
    pub fn set_workspace(&mut self, text: &str) -> Result<(), String> {
        let cells: usize = text
            .parse()
            .map_err(|_| format!("invalid workspace size: {}", text))?;
        if cells <= self.gc_threshold {
            return Err(format!(
                "workspace must exceed {} cells, got {}",
                self.gc_threshold, cells
            ));
        }
        if cells > u32::MAX as usize {
            return Err(format!(
                "workspace must not exceed {} cells, got {}",
                u32::MAX,
                cells
            ));
        }
        self.workspace_size = cells;
        Ok(())
    }

    /// No banner and no free-space prompt, for scripted use.
    pub fn quiet(mut self) -> Self {
        self.banner = false;
        self.show_freespace = false;
        self
    }
}
