mod canvas;
mod chart;
mod overlay;
mod profile;
mod renderer;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use profile::ReactionInput;
use renderer::{DiagramRenderer, DEFAULT_HEIGHT, DEFAULT_WIDTH};

/// Render a potential energy diagram for a reaction as SVG.
#[derive(Parser, Debug)]
#[command(name = "enthalpy")]
struct Cli {
    /// Comma-separated reactants, e.g. "H2, O2"
    #[arg(long)]
    reactants: String,
    /// Comma-separated products, e.g. "H2O"
    #[arg(long)]
    products: String,
    /// Enthalpy change in kJ (non-zero)
    #[arg(long, allow_hyphen_values = true)]
    delta_h: String,
    #[arg(long, default_value_t = DEFAULT_WIDTH)]
    width: u32,
    #[arg(long, default_value_t = DEFAULT_HEIGHT)]
    height: u32,
    /// Output file; the SVG goes to stdout when omitted
    #[arg(long)]
    out: Option<PathBuf>,
    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    run(cli).await
}

/// Renders the diagram described by `cli` and writes it out.
async fn run(cli: Cli) -> Result<()> {
    let input = ReactionInput::parse(&cli.reactants, &cli.products, &cli.delta_h)
        .map_err(|e| anyhow!("{} ({e})", e.user_message()))?;
    let equation = input.equation();

    let mut renderer = DiagramRenderer::new(cli.width, cli.height);
    if !renderer.present(input.profile()).await {
        return Err(anyhow!("chart layout never completed"));
    }
    let svg = renderer.composite_svg().map_err(|e| anyhow!(e))?;

    match cli.out {
        Some(path) => {
            fs::write(&path, svg).with_context(|| format!("write {}", path.display()))?;
            info!(path = %path.display(), "diagram written");
            println!("{equation}");
        }
        None => {
            eprintln!("{equation}");
            println!("{svg}");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_accepts_negative_delta_h() {
        let cli = Cli::try_parse_from([
            "enthalpy",
            "--reactants",
            "H2, O2",
            "--products",
            "H2O",
            "--delta-h",
            "-241.8",
        ])
        .unwrap();
        assert_eq!(cli.delta_h, "-241.8");
        assert_eq!(cli.width, DEFAULT_WIDTH);
        assert!(cli.out.is_none());
    }

    #[test]
    fn test_cli_requires_inputs() {
        assert!(Cli::try_parse_from(["enthalpy", "--reactants", "A"]).is_err());
    }

    #[tokio::test]
    async fn test_run_writes_svg_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("diagram.svg");
        let cli = Cli::try_parse_from([
            "enthalpy",
            "--reactants",
            "N2O4",
            "--products",
            "NO2",
            "--delta-h",
            "57",
            "--out",
            path.to_str().unwrap(),
        ])
        .unwrap();
        run(cli).await.unwrap();

        let svg = fs::read_to_string(&path).unwrap();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("Enthalpy Diagram (Endothermic)"));
        assert!(svg.contains("ΔH = 57 kJ"));
        assert!(svg.contains("Ea = 107 kJ"));
    }

    #[tokio::test]
    async fn test_run_rejects_bad_delta_h() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("diagram.svg");
        let cli = Cli::try_parse_from([
            "enthalpy",
            "--reactants",
            "A",
            "--products",
            "B",
            "--delta-h",
            "12abc",
            "--out",
            path.to_str().unwrap(),
        ])
        .unwrap();
        let err = run(cli).await.unwrap_err();
        assert!(err.to_string().contains(profile::INVALID_DELTA_H_MESSAGE));
        assert!(!path.exists());
    }
}
