//! Increment stream decoder
//!
//! Consumer side of an increment: walks the tar transport header by header,
//! classifies every `INCR_MANIFEST` it meets and hands all other payloads to
//! a [`PayloadSink`]. Applying pages to restored files is the sink's job.

use std::io::Read;

use tracing::{debug, info};

use crate::config::Config;
use crate::error::{IncrError, Result};
use crate::manifest::{ManifestClassification, ManifestClassifier};
use crate::tar::{EntryKind, TarBlockReader, TarHeader};

/// Receives the payload of every non-manifest entry
pub trait PayloadSink {
    /// Consume as much of `payload` as needed; the decoder skips the rest
    fn consume(&mut self, header: &TarHeader, payload: &mut dyn Read) -> Result<()>;
}

impl<F> PayloadSink for F
where
    F: FnMut(&TarHeader, &mut dyn Read) -> Result<()>,
{
    fn consume(&mut self, header: &TarHeader, payload: &mut dyn Read) -> Result<()> {
        (*self)(header, payload)
    }
}

/// Sink that reads nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardPayload;

impl PayloadSink for DiscardPayload {
    fn consume(&mut self, _header: &TarHeader, _payload: &mut dyn Read) -> Result<()> {
        Ok(())
    }
}

/// One entry the decoder dispatched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedEntry {
    pub name: String,
    pub size: u64,
    pub blocks: u64,
    pub kind: EntryKind,
}

impl DecodedEntry {
    fn from_header(header: &TarHeader) -> Self {
        Self {
            name: header.name().to_string(),
            size: header.size(),
            blocks: header.blocks(),
            kind: header.kind(),
        }
    }
}

/// Everything seen in one stream, in stream order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodeReport {
    /// Every dispatched entry, manifests included
    pub entries: Vec<DecodedEntry>,
    pub manifests: Vec<ManifestClassification>,
}

impl DecodeReport {
    /// Entries other than manifests
    pub fn file_entries(&self) -> impl Iterator<Item = &DecodedEntry> {
        self.entries.iter().filter(|e| e.kind != EntryKind::Manifest)
    }

    /// The first manifest, if any
    pub fn manifest(&self) -> Option<&ManifestClassification> {
        self.manifests.first()
    }
}

/// Decoder state between blocks
#[derive(Debug)]
enum DecodeState {
    AwaitHeader,
    HaveHeader(TarHeader),
    End,
}

/// Drives a tar transport through the manifest classifier and payload sink
pub struct IncrementDecoder<C, S> {
    classifier: C,
    sink: S,
    verify_header_checksum: bool,
}

impl<C: ManifestClassifier, S: PayloadSink> IncrementDecoder<C, S> {
    pub fn new(classifier: C, sink: S) -> Self {
        Self {
            classifier,
            sink,
            verify_header_checksum: false,
        }
    }

    /// Apply the decoding options from `config`
    pub fn with_config(mut self, config: &Config) -> Self {
        self.verify_header_checksum = config.verify_header_checksum;
        self
    }

    pub fn verify_header_checksum(mut self, verify: bool) -> Self {
        self.verify_header_checksum = verify;
        self
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Decode a whole stream
    pub fn decode<R: Read>(&mut self, input: R) -> Result<DecodeReport> {
        let mut reader = TarBlockReader::new(input);
        self.decode_blocks(&mut reader)
    }

    /// Decode from an existing block reader
    ///
    /// On error the reader is left just past the last block consumed, which
    /// for a rejected header is the end of that header.
    pub fn decode_blocks<R: Read>(&mut self, reader: &mut TarBlockReader<R>) -> Result<DecodeReport> {
        let mut report = DecodeReport::default();
        let mut state = DecodeState::AwaitHeader;

        loop {
            state = match state {
                DecodeState::AwaitHeader => match reader.next_header(self.verify_header_checksum)? {
                    Some(header) => DecodeState::HaveHeader(header),
                    None => DecodeState::End,
                },
                DecodeState::HaveHeader(header) => {
                    debug!(
                        name = header.name(),
                        size = header.size(),
                        blocks = header.blocks(),
                        kind = ?header.kind(),
                        "read tar header"
                    );
                    self.dispatch(reader, &header, &mut report)?;
                    report.entries.push(DecodedEntry::from_header(&header));
                    DecodeState::AwaitHeader
                }
                DecodeState::End => break,
            };
        }

        info!(
            entries = report.entries.len(),
            manifests = report.manifests.len(),
            bytes = reader.position(),
            "decoded increment"
        );
        Ok(report)
    }

    fn dispatch<R: Read>(
        &mut self,
        reader: &mut TarBlockReader<R>,
        header: &TarHeader,
        report: &mut DecodeReport,
    ) -> Result<()> {
        if header.is_manifest() {
            let payload = reader.read_payload(header)?;
            let text = String::from_utf8(payload)
                .map_err(|_| IncrError::Manifest("incoherent manifest: not valid UTF-8".into()))?;
            let classification = self.classifier.classify(&text).map_err(|e| match e {
                IncrError::Manifest(msg) => IncrError::Manifest(format!("incoherent manifest: {}", msg)),
                other => other,
            })?;
            report.manifests.push(classification);
            return Ok(());
        }

        let mut entry = reader.entry(header);
        self.sink.consume(header, &mut entry)?;
        let skipped = entry.finish()?;
        if skipped > 0 {
            debug!(name = header.name(), skipped, "sink left payload unread");
        }
        Ok(())
    }
}
