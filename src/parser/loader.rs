use crate::conversion::timestamp_to_seconds;
use crate::error::ULogError;
use crate::filters::NameFilter;
use crate::parser::decoder::{build_layout, decode_info_value, decode_sample, decode_value};
use crate::parser::header::{parse_file_header, parse_flag_bits, parse_format, parse_key};
use crate::parser::stream::{decode_string, ULogDataStream};
use crate::types::*;
use crate::Result;
use anyhow::Context;
use std::collections::HashMap;
use std::path::Path;

pub const MSG_TYPE_FLAG_BITS: u8 = b'B';
pub const MSG_TYPE_FORMAT: u8 = b'F';
pub const MSG_TYPE_INFO: u8 = b'I';
pub const MSG_TYPE_INFO_MULTIPLE: u8 = b'M';
pub const MSG_TYPE_PARAMETER: u8 = b'P';
pub const MSG_TYPE_PARAMETER_DEFAULT: u8 = b'Q';
pub const MSG_TYPE_ADD_LOGGED_MSG: u8 = b'A';
pub const MSG_TYPE_REMOVE_LOGGED_MSG: u8 = b'R';
pub const MSG_TYPE_DATA: u8 = b'D';
pub const MSG_TYPE_LOGGING: u8 = b'L';
pub const MSG_TYPE_LOGGING_TAGGED: u8 = b'C';
pub const MSG_TYPE_SYNC: u8 = b'S';
pub const MSG_TYPE_DROPOUT: u8 = b'O';

/// Size of the message header: u16 payload size + u8 type
const MSG_HEADER_SIZE: usize = 3;

/// Options controlling how a ULog file is loaded
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Only subscribe to these message names (`None` loads everything)
    pub message_filter: Option<NameFilter>,
    /// Decode invalid UTF-8 in string content lossily instead of failing
    pub ignore_string_errors: bool,
}

/// Parse a ULog file from disk
pub fn parse_ulog_file(file_path: &Path, options: &LoadOptions, debug: bool) -> Result<ULogData> {
    if debug {
        println!("=== PARSING ULOG FILE ===");
        let metadata = std::fs::metadata(file_path)?;
        println!(
            "File size: {} bytes ({:.2} MB)",
            metadata.len(),
            metadata.len() as f64 / 1024.0 / 1024.0
        );
    }

    let file_data = std::fs::read(file_path)
        .with_context(|| format!("Failed to read ULog file: {:?}", file_path))?;

    parse_ulog_bytes(&file_data, options, debug)
        .with_context(|| format!("Failed to parse ULog file: {:?}", file_path))
}

/// Parse ULog data from memory
pub fn parse_ulog_bytes(data: &[u8], options: &LoadOptions, debug: bool) -> Result<ULogData> {
    let mut parser = ULogParser::new(data, options, debug);
    parser.run()?;
    let log = parser.finish();

    if debug {
        println!(
            "Loaded {} record set(s), {} samples, {:.2}s of data",
            log.record_sets.len(),
            log.total_samples(),
            timestamp_to_seconds(log.duration_us())
        );
        if log.stats.corrupted {
            println!(
                "File corruption detected, skipped {} bytes",
                log.stats.skipped_bytes
            );
        }
    }

    Ok(log)
}

/// Active subscription created by an add-logged-message
struct Subscription {
    layout: MessageLayout,
    record_index: usize,
}

struct ULogParser<'a> {
    stream: ULogDataStream<'a>,
    options: &'a LoadOptions,
    debug: bool,
    log: ULogData,
    subscriptions: HashMap<u16, Subscription>,
    /// Record sets in first-subscription order, including empty ones
    record_sets: Vec<RecordSet>,
    last_timestamp_us: u64,
    in_data_section: bool,
    /// First appended-data offset still to jump to
    pending_appended_offset: Option<usize>,
}

impl<'a> ULogParser<'a> {
    fn new(data: &'a [u8], options: &'a LoadOptions, debug: bool) -> Self {
        let mut log = ULogData::default();
        log.stats.total_bytes = data.len() as u64;
        Self {
            stream: ULogDataStream::new(data),
            options,
            debug,
            log,
            subscriptions: HashMap::new(),
            record_sets: Vec::new(),
            last_timestamp_us: 0,
            in_data_section: false,
            pending_appended_offset: None,
        }
    }

    fn run(&mut self) -> Result<()> {
        self.log.header = parse_file_header(&mut self.stream)?;

        if self.debug {
            println!(
                "ULog version {}, start timestamp {} us",
                self.log.header.version, self.log.header.start_timestamp_us
            );
        }

        loop {
            if self.stream.remaining() < MSG_HEADER_SIZE {
                if self.stream.remaining() > 0 {
                    self.log.stats.truncated = true;
                }
                break;
            }

            let message_start = self.stream.pos;
            let msg_size = self.stream.read_u16()? as usize;
            let msg_type = self.stream.read_byte()?;

            if let Some(appended) = self.pending_appended_offset {
                if message_start + MSG_HEADER_SIZE + msg_size > appended {
                    // Main section ends here, continue with the appended data
                    self.pending_appended_offset = None;
                    self.stream.set_position(appended);
                    continue;
                }
            }

            let is_known = is_known_message_type(msg_type);
            let is_corrupted = msg_type == 0
                || (msg_size == 0 && msg_type != MSG_TYPE_SYNC)
                || (!is_known && msg_size > self.stream.remaining());

            if is_corrupted {
                if !self.in_data_section {
                    return Err(ULogError::InvalidMessage(format!(
                        "corrupted message (type 0x{:02x}, size {}) in definitions section at offset {}",
                        msg_type, msg_size, message_start
                    ))
                    .into());
                }
                self.resync(message_start);
                continue;
            }

            if !is_known {
                self.stream.set_position(self.stream.pos + msg_size);
                self.log.stats.unknown_messages += 1;
                if self.debug {
                    println!(
                        "Skipping unknown message type 0x{:02x} ({} bytes) at offset {}",
                        msg_type, msg_size, message_start
                    );
                }
                continue;
            }

            let payload = match self.stream.read_bytes(msg_size) {
                Ok(payload) => payload,
                Err(_) => {
                    if self.debug {
                        println!(
                            "Message at offset {} truncated by end of file",
                            message_start
                        );
                    }
                    self.log.stats.truncated = true;
                    break;
                }
            };

            self.log.stats.total_messages += 1;
            self.handle_message(msg_type, payload)?;
        }

        Ok(())
    }

    /// Skip corrupted bytes until the next sync marker
    fn resync(&mut self, message_start: usize) {
        self.log.stats.corrupted = true;
        self.stream.set_position(message_start + 1);
        let skipped = match self.stream.skip_to_next_sync() {
            Some(skipped) => skipped + 1,
            None => self.stream.pos - message_start,
        };
        self.log.stats.skipped_bytes += skipped as u64;
        if self.debug {
            println!(
                "Corrupted message at offset {}, skipped {} bytes",
                message_start, skipped
            );
        }
    }

    fn handle_message(&mut self, msg_type: u8, payload: &[u8]) -> Result<()> {
        let ignore = self.options.ignore_string_errors;

        match msg_type {
            MSG_TYPE_FLAG_BITS => {
                parse_flag_bits(payload, &mut self.log.header)?;
                if self.log.header.has_appended_data() {
                    let offset = self.log.header.appended_offsets[0] as usize;
                    if offset > 0 {
                        self.pending_appended_offset = Some(offset);
                    }
                }
            }
            MSG_TYPE_FORMAT => {
                let format = parse_format(payload, ignore)?;
                if self.debug {
                    println!(
                        "Format: {} ({} fields)",
                        format.name,
                        format.fields.len()
                    );
                }
                self.log.formats.insert(format.name.clone(), format);
            }
            MSG_TYPE_INFO => {
                let mut stream = ULogDataStream::new(payload);
                let key = parse_key(&mut stream, ignore)?;
                let value = decode_info_value(&key, &payload[stream.pos..], ignore)?;
                self.log.info.insert(key.name, value);
            }
            MSG_TYPE_INFO_MULTIPLE => {
                let mut stream = ULogDataStream::new(payload);
                let is_continued = stream.read_byte()? != 0;
                let key = parse_key(&mut stream, ignore)?;
                let value = decode_info_value(&key, &payload[stream.pos..], ignore)?;
                let values = self.log.info_multiple.entry(key.name).or_default();
                match values.last_mut() {
                    Some(last) if is_continued => last.push_str(&value),
                    _ => values.push(value),
                }
            }
            MSG_TYPE_PARAMETER => {
                let mut stream = ULogDataStream::new(payload);
                let key = parse_key(&mut stream, ignore)?;
                let value = decode_value(&key.field_type, &payload[stream.pos..])?;
                if self.in_data_section {
                    self.log.changed_parameters.push(ChangedParameter {
                        timestamp_us: self.last_timestamp_us,
                        name: key.name,
                        value,
                    });
                } else {
                    self.log.initial_parameters.insert(key.name, value);
                }
            }
            MSG_TYPE_PARAMETER_DEFAULT | MSG_TYPE_SYNC => {}
            MSG_TYPE_ADD_LOGGED_MSG => {
                self.in_data_section = true;
                self.add_subscription(payload)?;
            }
            MSG_TYPE_REMOVE_LOGGED_MSG => {
                let msg_id = ULogDataStream::new(payload).read_u16()?;
                self.subscriptions.remove(&msg_id);
            }
            MSG_TYPE_DATA => {
                self.in_data_section = true;
                self.handle_data(payload)?;
            }
            MSG_TYPE_LOGGING | MSG_TYPE_LOGGING_TAGGED => {
                self.in_data_section = true;
                let mut stream = ULogDataStream::new(payload);
                let log_level = stream.read_byte()?;
                let tag = if msg_type == MSG_TYPE_LOGGING_TAGGED {
                    Some(stream.read_u16()?)
                } else {
                    None
                };
                let timestamp_us = stream.read_u64()?;
                let message = decode_string(&payload[stream.pos..], ignore)?;
                self.log.logged_messages.push(LoggedMessage {
                    log_level,
                    tag,
                    timestamp_us,
                    message,
                });
            }
            MSG_TYPE_DROPOUT => {
                let duration_ms = ULogDataStream::new(payload).read_u16()?;
                self.log.dropouts.push(Dropout {
                    timestamp_us: self.last_timestamp_us,
                    duration_ms,
                });
            }
            _ => unreachable!("message type checked by is_known_message_type"),
        }

        Ok(())
    }

    fn add_subscription(&mut self, payload: &[u8]) -> Result<()> {
        let mut stream = ULogDataStream::new(payload);
        let multi_id = stream.read_byte()?;
        let msg_id = stream.read_u16()?;
        let name = decode_string(&payload[stream.pos..], self.options.ignore_string_errors)?;

        if let Some(filter) = &self.options.message_filter {
            if !filter.contains(&name) {
                if self.debug {
                    println!("Skipping filtered message: {}", name);
                }
                return Ok(());
            }
        }

        let layout = build_layout(&name, &self.log.formats)
            .with_context(|| format!("Failed to subscribe to message '{}'", name))?;

        if self.debug {
            println!(
                "Subscribed: {} (multi_id {}, msg_id {}, {} fields)",
                name,
                multi_id,
                msg_id,
                layout.fields.len()
            );
        }

        // Re-subscribing the same instance continues its record set
        let existing = self.record_sets.iter().position(|set| {
            set.name == name && set.multi_id == multi_id && set.fields == layout.fields
        });
        let record_index = match existing {
            Some(index) => index,
            None => {
                self.record_sets
                    .push(RecordSet::new(name, multi_id, msg_id, layout.fields.clone()));
                self.record_sets.len() - 1
            }
        };
        self.subscriptions.insert(
            msg_id,
            Subscription {
                layout,
                record_index,
            },
        );
        Ok(())
    }

    fn handle_data(&mut self, payload: &[u8]) -> Result<()> {
        let mut stream = ULogDataStream::new(payload);
        let msg_id = stream.read_u16()?;
        self.log.stats.data_messages += 1;

        let Some(subscription) = self.subscriptions.get(&msg_id) else {
            self.log.stats.skipped_data_messages += 1;
            return Ok(());
        };

        let values = decode_sample(&subscription.layout, &payload[stream.pos..])?;
        let record_set = &mut self.record_sets[subscription.record_index];
        record_set.push_sample(values);

        if let Some(timestamp) = record_set.timestamp_at(record_set.sample_count() - 1) {
            self.last_timestamp_us = self.last_timestamp_us.max(timestamp);
        }
        Ok(())
    }

    fn finish(mut self) -> ULogData {
        self.log.record_sets = self
            .record_sets
            .into_iter()
            .filter(|set| !set.is_empty())
            .collect();
        self.log
    }
}

fn is_known_message_type(msg_type: u8) -> bool {
    matches!(
        msg_type,
        MSG_TYPE_FLAG_BITS
            | MSG_TYPE_FORMAT
            | MSG_TYPE_INFO
            | MSG_TYPE_INFO_MULTIPLE
            | MSG_TYPE_PARAMETER
            | MSG_TYPE_PARAMETER_DEFAULT
            | MSG_TYPE_ADD_LOGGED_MSG
            | MSG_TYPE_REMOVE_LOGGED_MSG
            | MSG_TYPE_DATA
            | MSG_TYPE_LOGGING
            | MSG_TYPE_LOGGING_TAGGED
            | MSG_TYPE_SYNC
            | MSG_TYPE_DROPOUT
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::header::ULOG_MAGIC;
    use crate::parser::stream::SYNC_MAGIC;

    fn message(msg_type: u8, payload: &[u8]) -> Vec<u8> {
        let mut out = (payload.len() as u16).to_le_bytes().to_vec();
        out.push(msg_type);
        out.extend_from_slice(payload);
        out
    }

    fn file_header() -> Vec<u8> {
        let mut out = ULOG_MAGIC.to_vec();
        out.push(1);
        out.extend_from_slice(&0u64.to_le_bytes());
        out
    }

    fn add(multi_id: u8, msg_id: u16, name: &str) -> Vec<u8> {
        let mut payload = vec![multi_id];
        payload.extend_from_slice(&msg_id.to_le_bytes());
        payload.extend_from_slice(name.as_bytes());
        message(MSG_TYPE_ADD_LOGGED_MSG, &payload)
    }

    fn data(msg_id: u16, timestamp: u64, x: f32) -> Vec<u8> {
        let mut payload = msg_id.to_le_bytes().to_vec();
        payload.extend_from_slice(&timestamp.to_le_bytes());
        payload.extend_from_slice(&x.to_le_bytes());
        message(MSG_TYPE_DATA, &payload)
    }

    fn simple_log() -> Vec<u8> {
        let mut bytes = file_header();
        bytes.extend(message(MSG_TYPE_FORMAT, b"A:uint64_t timestamp;float x;"));
        bytes.extend(message(MSG_TYPE_FORMAT, b"B:uint64_t timestamp;float x;"));
        bytes.extend(add(0, 1, "A"));
        bytes.extend(add(0, 2, "B"));
        bytes.extend(data(1, 100, 1.0));
        bytes.extend(data(2, 150, 5.0));
        bytes.extend(data(1, 200, 2.0));
        bytes
    }

    #[test]
    fn test_parse_record_sets_in_subscription_order() {
        let log = parse_ulog_bytes(&simple_log(), &LoadOptions::default(), false).unwrap();
        assert_eq!(log.record_sets.len(), 2);
        assert_eq!(log.record_sets[0].name, "A");
        assert_eq!(log.record_sets[0].sample_count(), 2);
        assert_eq!(log.record_sets[1].name, "B");
        assert_eq!(log.record_sets[1].sample_count(), 1);
        assert_eq!(log.stats.data_messages, 3);
        assert_eq!(log.duration_us(), 100);
    }

    #[test]
    fn test_message_filter_skips_unsubscribed_data() {
        let options = LoadOptions {
            message_filter: NameFilter::parse("B"),
            ignore_string_errors: false,
        };
        let log = parse_ulog_bytes(&simple_log(), &options, false).unwrap();
        assert_eq!(log.record_sets.len(), 1);
        assert_eq!(log.record_sets[0].name, "B");
        assert_eq!(log.stats.skipped_data_messages, 2);
    }

    #[test]
    fn test_empty_subscriptions_are_dropped() {
        let mut bytes = simple_log();
        bytes.extend(message(MSG_TYPE_FORMAT, b"C:uint64_t timestamp;"));
        bytes.extend(add(0, 3, "C"));
        let log = parse_ulog_bytes(&bytes, &LoadOptions::default(), false).unwrap();
        assert!(log.record_set("C", 0).is_none());
    }

    #[test]
    fn test_truncated_message_ends_parsing() {
        let mut bytes = simple_log();
        let mut partial = data(1, 300, 3.0);
        partial.truncate(partial.len() - 2);
        bytes.extend(partial);
        let log = parse_ulog_bytes(&bytes, &LoadOptions::default(), false).unwrap();
        assert!(log.stats.truncated);
        assert_eq!(log.record_sets[0].sample_count(), 2);
    }

    #[test]
    fn test_resync_after_corruption() {
        let mut bytes = simple_log();
        bytes.extend_from_slice(&[0x05, 0x00, 0x00, 1, 2, 3]);
        bytes.extend(message(MSG_TYPE_SYNC, &SYNC_MAGIC));
        bytes.extend(data(1, 300, 3.0));
        let log = parse_ulog_bytes(&bytes, &LoadOptions::default(), false).unwrap();
        assert!(log.stats.corrupted);
        assert!(log.stats.skipped_bytes > 0);
        assert_eq!(log.record_sets[0].sample_count(), 3);
    }

    #[test]
    fn test_unknown_message_types_are_skipped() {
        let mut bytes = file_header();
        bytes.extend(message(b'Z', b"junk"));
        bytes.extend(simple_log().split_off(16));
        bytes.extend(message(b'Z', &[0xAA; 40]));
        bytes.extend(data(1, 300, 3.0));
        bytes.extend(data(1, 400, 4.0));

        let log = parse_ulog_bytes(&bytes, &LoadOptions::default(), false).unwrap();
        assert!(!log.stats.corrupted);
        assert_eq!(log.stats.unknown_messages, 2);
        assert_eq!(log.stats.skipped_bytes, 0);
        assert_eq!(log.record_sets[0].sample_count(), 4);
    }

    #[test]
    fn test_corrupted_message_in_definitions_is_fatal() {
        let mut bytes = file_header();
        bytes.extend_from_slice(&[0x00, 0x00, b'F']);
        bytes.extend(message(MSG_TYPE_FORMAT, b"A:uint64_t timestamp;float x;"));
        assert!(parse_ulog_bytes(&bytes, &LoadOptions::default(), false).is_err());

        let mut bytes = file_header();
        bytes.extend(message(0, b"junk"));
        assert!(parse_ulog_bytes(&bytes, &LoadOptions::default(), false).is_err());
    }

    #[test]
    fn test_unknown_message_past_end_of_file_is_corruption() {
        let mut bytes = simple_log();
        bytes.extend_from_slice(&[0xFF, 0x00, b'Z', 1, 2, 3]);
        let log = parse_ulog_bytes(&bytes, &LoadOptions::default(), false).unwrap();
        assert!(log.stats.corrupted);
        assert_eq!(log.record_sets[0].sample_count(), 2);
    }

    #[test]
    fn test_invalid_magic_is_fatal() {
        let err = parse_ulog_bytes(b"this is not a ulog file", &LoadOptions::default(), false)
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ULogError>(),
            Some(ULogError::InvalidMagic)
        ));
    }

    #[test]
    fn test_info_parameters_and_logging() {
        let mut bytes = file_header();
        let mut info = vec![13u8];
        info.extend_from_slice(b"char[3] sys_x");
        info.extend_from_slice(b"PX4");
        bytes.extend(message(MSG_TYPE_INFO, &info));

        let mut param = vec![14u8];
        param.extend_from_slice(b"int32_t SYS_AB");
        param.extend_from_slice(&7i32.to_le_bytes());
        bytes.extend(message(MSG_TYPE_PARAMETER, &param));

        bytes.extend(message(MSG_TYPE_FORMAT, b"A:uint64_t timestamp;float x;"));
        bytes.extend(add(0, 1, "A"));
        bytes.extend(data(1, 500, 1.0));

        let mut changed = vec![14u8];
        changed.extend_from_slice(b"float MPC_XY_P");
        changed.extend_from_slice(&0.5f32.to_le_bytes());
        bytes.extend(message(MSG_TYPE_PARAMETER, &changed));

        let mut logging = vec![b'6'];
        logging.extend_from_slice(&600u64.to_le_bytes());
        logging.extend_from_slice(b"Takeoff detected");
        bytes.extend(message(MSG_TYPE_LOGGING, &logging));
        bytes.extend(message(MSG_TYPE_DROPOUT, &25u16.to_le_bytes()));

        let log = parse_ulog_bytes(&bytes, &LoadOptions::default(), false).unwrap();
        assert_eq!(log.info.get("sys_x").map(String::as_str), Some("PX4"));
        assert_eq!(log.initial_parameters.get("SYS_AB"), Some(&Value::Int(7)));
        assert_eq!(log.changed_parameters.len(), 1);
        assert_eq!(log.changed_parameters[0].timestamp_us, 500);
        assert_eq!(log.changed_parameters[0].value, Value::Float(0.5));
        assert_eq!(log.logged_messages[0].message, "Takeoff detected");
        assert_eq!(log.logged_messages[0].timestamp_us, 600);
        assert_eq!(
            log.dropouts,
            vec![Dropout {
                timestamp_us: 500,
                duration_ms: 25
            }]
        );
    }

    #[test]
    fn test_info_multiple_continuation() {
        let mut bytes = file_header();
        for (continued, chunk) in [(0u8, "abc"), (1u8, "def"), (0u8, "xyz")] {
            let mut payload = vec![continued, 16u8];
            payload.extend_from_slice(b"char[3] perf_top");
            payload.extend_from_slice(chunk.as_bytes());
            bytes.extend(message(MSG_TYPE_INFO_MULTIPLE, &payload));
        }
        let log = parse_ulog_bytes(&bytes, &LoadOptions::default(), false).unwrap();
        assert_eq!(
            log.info_multiple.get("perf_top"),
            Some(&vec!["abcdef".to_string(), "xyz".to_string()])
        );
    }

    #[test]
    fn test_string_errors_respect_ignore_flag() {
        let mut bytes = file_header();
        let mut info = vec![13u8];
        info.extend_from_slice(b"char[3] sys_x");
        info.extend_from_slice(&[b'o', b'k', 0xff]);
        bytes.extend(message(MSG_TYPE_INFO, &info));

        assert!(parse_ulog_bytes(&bytes, &LoadOptions::default(), false).is_err());

        let options = LoadOptions {
            message_filter: None,
            ignore_string_errors: true,
        };
        let log = parse_ulog_bytes(&bytes, &options, false).unwrap();
        assert_eq!(log.info.get("sys_x").map(String::as_str), Some("ok\u{FFFD}"));
    }
}
