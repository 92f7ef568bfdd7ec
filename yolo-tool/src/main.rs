use anyhow::{format_err, Context, Result};
use bbox::prelude::*;
use clap::Parser;
use log::info;
use prettytable::{cell, row, Table};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};
use yolo_data::{
    config::Config,
    dataset::VocDataset,
    grid::GridDecoder,
    record::{decode_labels, write_records, RecordStream},
    stream::TrainingStream,
};

#[derive(Debug, Clone, Parser)]
/// Build and inspect YOLO grid-label record files.
enum Opts {
    /// Convert a Pascal VOC split into a record file.
    Build {
        /// configuration file
        #[clap(long)]
        config: PathBuf,
        /// VOC dataset directory
        #[clap(long)]
        voc_dir: PathBuf,
        /// split name, e.g. "train" or "val"
        #[clap(long)]
        split: String,
        /// output record file, defaults to "<split>.rec"
        #[clap(long)]
        output: Option<PathBuf>,
    },
    /// Print record and box counts of a record file.
    Info {
        /// configuration file providing the class names
        #[clap(long)]
        config: Option<PathBuf>,
        /// record file
        record_file: PathBuf,
    },
    /// Run the training pipeline and print the decoded boxes.
    Inspect {
        /// configuration file
        #[clap(long)]
        config: PathBuf,
        /// record file
        record_file: PathBuf,
        /// number of batches of `stream.batch_size` samples
        #[clap(long, default_value = "1")]
        count: usize,
        /// directory to save the processed images to
        #[clap(long)]
        output_dir: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let filters = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into());
    pretty_env_logger::formatted_builder()
        .parse_filters(&filters)
        .init();

    match Opts::parse() {
        Opts::Build {
            config,
            voc_dir,
            split,
            output,
        } => {
            let output = output.unwrap_or_else(|| PathBuf::from(format!("{}.rec", split)));
            build(config, voc_dir, &split, output)?;
        }
        Opts::Info {
            config,
            record_file,
        } => info(config, record_file)?,
        Opts::Inspect {
            config,
            record_file,
            count,
            output_dir,
        } => inspect(config, record_file, count, output_dir)?,
    }

    Ok(())
}

fn build(
    config_file: impl AsRef<Path>,
    voc_dir: impl AsRef<Path>,
    split: &str,
    output_file: impl AsRef<Path>,
) -> Result<()> {
    let config = Config::open(config_file)?;
    let dataset = VocDataset::open(&config.dataset, voc_dir, split)?;
    let count = write_records(output_file.as_ref(), dataset.iter())?;
    info!(
        "converted {} of {} images in split '{}'",
        count,
        dataset.len(),
        split
    );
    Ok(())
}

fn info(config_file: Option<impl AsRef<Path>>, record_file: impl AsRef<Path>) -> Result<()> {
    let record_file = record_file.as_ref();
    let config = config_file.map(Config::open).transpose()?;

    let mut num_records = 0;
    let mut num_boxes = 0;
    let mut class_counts: BTreeMap<usize, usize> = BTreeMap::new();

    for record in RecordStream::open(record_file)? {
        let record = record?;
        let boxes = decode_labels(&record.label)
            .with_context(|| format!("invalid record '{}'", record.filename_lossy()))?;

        num_records += 1;
        num_boxes += boxes.len();
        boxes
            .iter()
            .for_each(|label| *class_counts.entry(label.class).or_default() += 1);
    }

    // print summary
    {
        let mut table = Table::new();
        table.add_row(row!["file", "records", "boxes"]);
        table.add_row(row![record_file.display(), num_records, num_boxes]);
        table.printstd();
    }

    // print per-class counts
    {
        let mut table = Table::new();
        table.add_row(row!["class", "name", "boxes"]);

        class_counts.iter().for_each(|(&class, &count)| {
            let name = class_name(config.as_ref(), class);
            table.add_row(row![class, name, count]);
        });

        table.printstd();
    }

    Ok(())
}

fn inspect(
    config_file: impl AsRef<Path>,
    record_file: impl AsRef<Path>,
    count: usize,
    output_dir: Option<PathBuf>,
) -> Result<()> {
    let config = Config::open(config_file)?;
    let decoder = GridDecoder::new(&config.dataset);
    let stream = TrainingStream::open(&config, record_file)?;

    if let Some(dir) = &output_dir {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create directory '{}'", dir.display()))?;
    }

    let mut table = Table::new();
    table.add_row(row!["batch", "sample", "file", "class", "x1", "y1", "x2", "y2"]);

    for (batch_index, batch) in stream.configured_batches().take(count).enumerate() {
        let batch = batch?;
        info!(
            "batch {}: images {:?}, labels {:?}",
            batch_index,
            batch.images.shape(),
            batch.labels.shape()
        );

        for index in 0..batch.len() {
            let sample = batch
                .sample(index)
                .ok_or_else(|| format_err!("batch {} has no sample {}", batch_index, index))?;
            let boxes = decoder.decode(sample.label.view())?;

            boxes.iter().for_each(|label| {
                let rect = &label.rect;
                table.add_row(row![
                    batch_index,
                    index,
                    sample.filename,
                    class_name(Some(&config), label.class),
                    format!("{:.1}", rect.l()),
                    format!("{:.1}", rect.t()),
                    format!("{:.1}", rect.r()),
                    format!("{:.1}", rect.b())
                ]);
            });

            if let Some(dir) = &output_dir {
                let path = dir.join(format!("{:04}-{:02}.png", batch_index, index));
                sample
                    .to_rgb_image()?
                    .save(&path)
                    .with_context(|| format!("failed to save image '{}'", path.display()))?;
            }
        }
    }

    table.printstd();
    Ok(())
}

fn class_name(config: Option<&Config>, class: usize) -> String {
    config
        .and_then(|config| config.dataset.classes.get_index(class))
        .cloned()
        .unwrap_or_else(|| format!("#{}", class))
}
