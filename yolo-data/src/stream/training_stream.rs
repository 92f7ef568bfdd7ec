use super::{Batch, Sample, SampleProcessor, ShuffleBuffer};
use crate::{
    common::*,
    config::Config,
    record::{RecordStream, SerializedRecord},
    DataError,
};

/// Where the training stream reads records from.
#[derive(Debug, Clone)]
pub enum RecordSource {
    /// A record file, reopened at each epoch.
    File(PathBuf),
    /// Records held in memory.
    Memory(Arc<Vec<SerializedRecord>>),
}

type Job = Result<(u64, SerializedRecord)>;

/// An endless stream of training samples.
///
/// A reader thread cycles over the record source and hands out records to a
/// pool of worker threads, which turn them into [Sample]s. The processed
/// samples pass through a [ShuffleBuffer] before they are yielded.
///
/// Errors from any stage are yielded as `Err` items. The stream ends after
/// an error stops the reader. Dropping the stream stops all threads.
pub struct TrainingStream {
    samples: ShuffleBuffer<flume::IntoIter<Result<Sample>>>,
    batch_size: NonZeroUsize,
}

impl TrainingStream {
    /// Stream the records of a record file.
    pub fn open<P>(config: &Config, path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();

        // surface a missing or empty file before any thread starts
        let first = RecordStream::open(path)?.next().transpose()?;
        ensure!(
            first.is_some(),
            DataError::Format(format!("the record file '{}' is empty", path.display()))
        );

        Self::new(config, RecordSource::File(path.to_owned()))
    }

    /// Stream records held in memory.
    pub fn from_records(config: &Config, records: Vec<SerializedRecord>) -> Result<Self> {
        ensure!(
            !records.is_empty(),
            DataError::Format("the record list is empty".into())
        );
        Self::new(config, RecordSource::Memory(Arc::new(records)))
    }

    pub fn new(config: &Config, source: RecordSource) -> Result<Self> {
        config.validate()?;
        let num_workers = config.stream.num_workers();
        let channel_size = config.stream.channel_size();
        let processor = SampleProcessor::new(config)?;

        let (job_tx, job_rx) = flume::bounded::<Job>(channel_size);
        let (sample_tx, sample_rx) = flume::bounded::<Result<Sample>>(channel_size);

        thread::Builder::new()
            .name("record-reader".into())
            .spawn(move || read_records(source, job_tx))
            .context("failed to spawn the record reader")?;

        for worker_index in 0..num_workers {
            let job_rx = job_rx.clone();
            let sample_tx = sample_tx.clone();
            let processor = processor.clone();

            thread::Builder::new()
                .name(format!("sample-worker-{}", worker_index))
                .spawn(move || {
                    for job in job_rx.iter() {
                        let result = job.and_then(|(index, record)| {
                            processor.process(index, &record).with_context(|| {
                                format!("failed on record '{}'", record.filename_lossy())
                            })
                        });
                        if sample_tx.send(result).is_err() {
                            break;
                        }
                    }
                    trace!("sample worker {} stopped", worker_index);
                })
                .context("failed to spawn a sample worker")?;
        }
        debug!(
            "started training stream with {} workers and channel size {}",
            num_workers, channel_size
        );

        let rng = match config.stream.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let samples = ShuffleBuffer::new(sample_rx.into_iter(), config.stream.shuffle_buffer, rng);

        Ok(Self {
            samples,
            batch_size: config.stream.batch_size,
        })
    }

    /// Group the samples into batches of the configured `stream.batch_size`.
    pub fn configured_batches(self) -> Batches {
        let batch_size = self.batch_size;
        self.batches(batch_size)
    }

    /// Group the samples into batches of `batch_size`.
    pub fn batches(self, batch_size: NonZeroUsize) -> Batches {
        Batches {
            stream: self,
            batch_size: batch_size.get(),
        }
    }
}

impl Iterator for TrainingStream {
    type Item = Result<Sample>;

    fn next(&mut self) -> Option<Self::Item> {
        self.samples.next()
    }
}

/// Fixed-size batches of a [TrainingStream].
///
/// A failed sample fails its batch. A trailing incomplete batch is dropped.
pub struct Batches {
    stream: TrainingStream,
    batch_size: usize,
}

impl Iterator for Batches {
    type Item = Result<Batch>;

    fn next(&mut self) -> Option<Self::Item> {
        let samples: Result<Vec<_>> = (&mut self.stream).take(self.batch_size).collect();
        match samples {
            Ok(samples) if samples.len() == self.batch_size => Some(Batch::from_samples(&samples)),
            Ok(_) => None,
            Err(err) => Some(Err(err)),
        }
    }
}

/// Send `(index, record)` jobs cyclically until the receivers are gone or an
/// error occurs.
fn read_records(source: RecordSource, tx: flume::Sender<Job>) {
    let mut index = 0u64;

    for epoch in 0.. {
        let records: Box<dyn Iterator<Item = Result<SerializedRecord>> + '_> = match &source {
            RecordSource::File(path) => match RecordStream::open(path) {
                Ok(stream) => Box::new(stream),
                Err(err) => {
                    let _ = tx.send(Err(err));
                    return;
                }
            },
            RecordSource::Memory(records) => Box::new(records.iter().cloned().map(Ok)),
        };

        let mut count = 0;
        for record in records {
            let failed = record.is_err();
            if tx.send(record.map(|record| (index, record))).is_err() || failed {
                return;
            }
            index += 1;
            count += 1;
        }

        if count == 0 {
            let _ = tx.send(Err(
                DataError::Format("the record source has no records".into()).into(),
            ));
            return;
        }
        debug!("record reader finished epoch {} ({} records)", epoch, count);
    }
}
