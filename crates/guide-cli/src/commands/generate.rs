use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

use guide_core::{Configuration, GeneratedFile};

#[derive(Args)]
pub struct GenerateArgs {
    /// Path to config file
    pub config: PathBuf,

    /// Write documents into this directory instead of printing them
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Print documents as JSON
    #[arg(long, conflicts_with = "out")]
    pub json: bool,
}

fn render_text(files: &[GeneratedFile]) -> String {
    let mut out = String::new();
    for file in files {
        out.push_str(&format!("# ===== {} =====\n", file.name));
        if let Some(description) = &file.description {
            out.push_str(&format!("# {description}\n"));
        }
        out.push_str(&file.content);
        if !file.content.ends_with('\n') {
            out.push('\n');
        }
        out.push('\n');
    }
    out
}

pub fn execute(args: GenerateArgs) -> anyhow::Result<()> {
    let config = Configuration::from_file(&args.config)?;

    let mut files = guide_manifests::generate_files(&config)?;
    let commands = guide_manifests::generate_commands(&config);
    files.push(guide_manifests::install_script(&commands));

    if args.json {
        println!("{}", serde_json::to_string_pretty(&files)?);
        return Ok(());
    }

    let Some(dir) = args.out else {
        print!("{}", render_text(&files));
        return Ok(());
    };

    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Cannot create output directory {}", dir.display()))?;
    for file in &files {
        let path = dir.join(&file.name);
        std::fs::write(&path, &file.content)
            .with_context(|| format!("Cannot write {}", path.display()))?;
        tracing::info!(path = %path.display(), "Wrote document");
        println!("{}", path.display());
    }

    Ok(())
}
