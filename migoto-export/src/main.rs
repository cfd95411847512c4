//! migoto-export - mesh buffer export tool
//!
//! Converts meshes (OBJ) to 3DMigoto-ready binary buffer folders
//! (.buf + fmt + Metadata.json) and back.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use migoto_export::{files, model, obj};
use migoto_format::{parse_fmt, Metadata};

#[derive(Parser)]
#[command(name = "migoto-export")]
#[command(about = "3DMigoto mesh buffer export tool")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export a mesh to a mod buffer folder
    Export {
        /// Input mesh file (OBJ)
        input: PathBuf,

        /// Extraction Metadata.json (or a folder containing it)
        #[arg(short, long)]
        metadata: Option<PathBuf>,

        /// Output folder
        #[arg(short, long)]
        output: PathBuf,

        /// Mirror the mesh along X
        #[arg(long)]
        mirror: bool,

        /// Buffer names to skip (repeatable)
        #[arg(long = "skip")]
        skip: Vec<String>,
    },

    /// Import a mod buffer folder back into a mesh
    Import {
        /// Input folder with .buf files
        input: PathBuf,

        /// Output OBJ file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Print a summary of a fmt descriptor or Metadata.json
    Inspect {
        /// fmt or Metadata.json file
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Export {
            input,
            metadata,
            output,
            mirror,
            skip,
        } => {
            tracing::info!("Exporting {:?} -> {:?}", input, output);
            let mesh = obj::load_obj(&input)?;

            let extracted = metadata
                .as_deref()
                .map(files::read_metadata)
                .transpose()?;

            let data_model = model::DataModel::wwmi();
            let options = model::ExportOptions {
                mirror_mesh: mirror,
                excluded_buffers: skip,
                buffers_format: extracted.as_ref().and_then(|m| {
                    if m.data.export_format.is_empty() {
                        None
                    } else {
                        Some(
                            m.data
                                .export_format
                                .iter()
                                .map(|(name, buffer)| (name.clone(), buffer.to_layout()))
                                .collect(),
                        )
                    }
                }),
                components: extracted
                    .as_ref()
                    .map(files::metadata_components)
                    .unwrap_or_default(),
            };

            let mut cache = model::ExportCache::new();
            let exported = data_model.export(&mesh, &options, &mut cache)?;
            let out_metadata = files::build_metadata(&exported, extracted.as_ref());
            files::write_mod_folder(&output, &exported, &out_metadata)?;
            tracing::info!("Done!");
        }

        Commands::Import { input, output } => {
            tracing::info!("Importing {:?} -> {:?}", input, output);
            let data_model = model::DataModel::wwmi();
            let mesh = files::import_mesh(&input, &data_model)?;
            fs::write(&output, obj::write_obj(&mesh))
                .with_context(|| format!("failed to write {output:?}"))?;
            tracing::info!("Done!");
        }

        Commands::Inspect { input } => {
            let text = fs::read_to_string(&input)
                .with_context(|| format!("failed to read {input:?}"))?;
            if input
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(".json"))
            {
                let metadata = Metadata::from_json(&text)?;
                println!(
                    "{} v{}: {} vertices, {} indices, {} components, {} export buffers",
                    metadata.format_type,
                    metadata.format_version,
                    metadata.data.vertex_count,
                    metadata.data.index_count,
                    metadata.data.components.len(),
                    metadata.data.export_format.len(),
                );
                for (name, buffer) in &metadata.data.export_format {
                    let layout = buffer.to_layout();
                    println!("  {name}: stride {}", layout.stride());
                    for semantic in layout.semantics() {
                        println!(
                            "    {} {} offset {}",
                            semantic.semantic.name(),
                            semantic.format.name(),
                            semantic.offset,
                        );
                    }
                }
            } else {
                let fmt = parse_fmt(&text)?;
                println!(
                    "topology {}, stride {}",
                    fmt.topology,
                    fmt.vb_layout.stride()
                );
                for semantic in fmt.vb_layout.semantics() {
                    println!(
                        "  {} {} offset {} stride {}",
                        semantic.semantic.name(),
                        semantic.format.name(),
                        semantic.offset,
                        semantic.stride,
                    );
                }
            }
        }
    }

    Ok(())
}
