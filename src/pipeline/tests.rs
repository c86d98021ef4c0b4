use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::*;
use crate::engine::MediaEngine;

/// Scripted in-memory engine that records every interaction
#[derive(Default)]
struct MockEngine {
    store: Mutex<HashMap<String, Vec<u8>>>,
    staged_manifest: Mutex<Vec<u8>>,
    stage_calls: Mutex<Vec<String>>,
    run_calls: Mutex<Vec<Vec<String>>>,
    delete_calls: Mutex<Vec<String>>,
    fail_loop_trims: bool,
    fail_concat: bool,
    fail_mux: bool,
}

impl MockEngine {
    fn new() -> Self {
        Self::default()
    }

    async fn staged_names(&self) -> Vec<String> {
        self.stage_calls.lock().await.clone()
    }

    async fn runs(&self) -> Vec<Vec<String>> {
        self.run_calls.lock().await.clone()
    }

    async fn remaining_entries(&self) -> Vec<String> {
        let mut names: Vec<String> = self.store.lock().await.keys().cloned().collect();
        names.sort();
        names
    }

    async fn manifest_content(&self) -> String {
        String::from_utf8(self.staged_manifest.lock().await.clone()).unwrap()
    }

    fn output_name(args: &[String]) -> String {
        args.last().cloned().unwrap()
    }

    fn input_names(args: &[String]) -> Vec<String> {
        args.iter()
            .enumerate()
            .filter(|(_, a)| a.as_str() == "-i")
            .map(|(i, _)| args[i + 1].clone())
            .collect()
    }
}

#[async_trait]
impl MediaEngine for MockEngine {
    async fn stage_input(&self, name: &str, bytes: &[u8]) -> ApexResult<()> {
        self.stage_calls.lock().await.push(name.to_string());
        if name == "concat.txt" {
            *self.staged_manifest.lock().await = bytes.to_vec();
        }
        self.store
            .lock()
            .await
            .insert(name.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn run(&self, args: &[String]) -> ApexResult<()> {
        self.run_calls.lock().await.push(args.to_vec());

        let is_loop_trim = args.iter().any(|a| a == "-stream_loop");
        let is_concat = args.windows(2).any(|w| w[0] == "-f" && w[1] == "concat");
        let is_mux = args.iter().any(|a| a == "-shortest");

        if is_loop_trim && self.fail_loop_trims {
            return Err(ApexError::EncodeFailed {
                message: "stream_loop unsupported".to_string(),
            });
        }
        if is_concat && self.fail_concat {
            return Err(ApexError::EncodeFailed {
                message: "concat failed".to_string(),
            });
        }
        if is_mux && self.fail_mux {
            return Err(ApexError::EncodeFailed {
                message: "mux failed".to_string(),
            });
        }

        let output = Self::output_name(args);
        let mut store = self.store.lock().await;

        let data = if is_concat {
            // Concatenate the buffers named by the manifest, in order.
            let manifest = store
                .get("concat.txt")
                .cloned()
                .ok_or_else(|| ApexError::EncodeFailed {
                    message: "missing manifest".to_string(),
                })?;
            let manifest = String::from_utf8(manifest).unwrap();
            let mut data = Vec::new();
            for line in manifest.lines() {
                let name = line
                    .trim()
                    .trim_start_matches("file '")
                    .trim_end_matches('\'');
                let entry = store.get(name).ok_or_else(|| ApexError::EncodeFailed {
                    message: format!("missing entry {}", name),
                })?;
                data.extend_from_slice(entry);
            }
            data
        } else {
            // Trim and mux runs: copy every referenced input through.
            let mut data = Vec::new();
            for name in Self::input_names(args) {
                let entry = store.get(&name).ok_or_else(|| ApexError::EncodeFailed {
                    message: format!("missing entry {}", name),
                })?;
                data.extend_from_slice(entry);
            }
            data
        };

        store.insert(output, data);
        Ok(())
    }

    async fn read_output(&self, name: &str) -> ApexResult<Vec<u8>> {
        self.store
            .lock()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| ApexError::EncodeFailed {
                message: format!("no such entry: {}", name),
            })
    }

    async fn delete_entry(&self, name: &str) -> ApexResult<()> {
        self.delete_calls.lock().await.push(name.to_string());
        match self.store.lock().await.remove(name) {
            Some(_) => Ok(()),
            None => Err(ApexError::EncodeFailed {
                message: format!("no such entry: {}", name),
            }),
        }
    }
}

fn three_clips() -> Vec<Clip> {
    vec![
        Clip::from_file_name("a.mov", b"AAA".to_vec()),
        Clip::from_file_name("b.MP4", b"BBB".to_vec()),
        Clip::new(b"CCC".to_vec(), None),
    ]
}

fn beat_synced(bpm: u32, audio: Option<AudioSource>) -> AssemblyOptions {
    AssemblyOptions::BeatSynced {
        bpm,
        clips_per_beat: ClipsPerBeat::One,
        audio,
    }
}

#[tokio::test]
async fn test_empty_input_fails_without_engine_calls() {
    let engine = Arc::new(MockEngine::new());
    let assembler = Assembler::new(engine.clone());

    let result = assembler.assemble(&[], &AssemblyOptions::Simple).await;
    assert!(matches!(result, Err(ApexError::EmptyInput)));
    assert!(engine.staged_names().await.is_empty());
    assert!(engine.runs().await.is_empty());
}

#[tokio::test]
async fn test_out_of_range_bpm_fails_before_staging() {
    let engine = Arc::new(MockEngine::new());
    let assembler = Assembler::new(engine.clone());

    let result = assembler.assemble(&three_clips(), &beat_synced(30, None)).await;
    assert!(matches!(result, Err(ApexError::InvalidBpm { bpm: 30 })));
    assert!(engine.staged_names().await.is_empty());
    assert!(engine.runs().await.is_empty());
}

#[tokio::test]
async fn test_simple_mode_preserves_input_order() {
    let engine = Arc::new(MockEngine::new());
    let assembler = Assembler::new(engine.clone());

    let result = assembler
        .assemble(&three_clips(), &AssemblyOptions::Simple)
        .await
        .unwrap();

    // Manifest references the originals in the exact input order, with
    // extension hints preserved (lowercased, defaulting to mp4).
    let manifest = engine.manifest_content().await;
    assert_eq!(
        manifest,
        "file 'input0.mov'\nfile 'input1.mp4'\nfile 'input2.mp4'"
    );
    // Mock concat yields the buffers in manifest order.
    assert_eq!(result.data, b"AAABBBCCC");
    assert!(!result.audio_muxed);
}

#[tokio::test]
async fn test_beat_synced_trims_to_uniform_duration() {
    let engine = Arc::new(MockEngine::new());
    let assembler = Assembler::new(engine.clone());

    assembler
        .assemble(&three_clips(), &beat_synced(120, None))
        .await
        .unwrap();

    let runs = engine.runs().await;
    let trims: Vec<&Vec<String>> = runs
        .iter()
        .filter(|args| args.iter().any(|a| a == "-stream_loop"))
        .collect();
    assert_eq!(trims.len(), 3);
    for args in trims {
        // 120 BPM at one clip per beat is exactly 0.5 seconds.
        let t = args.iter().position(|a| a == "-t").unwrap();
        assert_eq!(args[t + 1], "0.5");
    }

    let manifest = engine.manifest_content().await;
    assert_eq!(
        manifest,
        "file 'segment0.mp4'\nfile 'segment1.mp4'\nfile 'segment2.mp4'"
    );
}

#[tokio::test]
async fn test_bpm_60_durations() {
    let engine = Arc::new(MockEngine::new());
    let assembler = Assembler::new(engine.clone());

    let options = AssemblyOptions::BeatSynced {
        bpm: 60,
        clips_per_beat: ClipsPerBeat::Two,
        audio: None,
    };
    assembler.assemble(&three_clips(), &options).await.unwrap();

    let runs = engine.runs().await;
    let trim = runs
        .iter()
        .find(|args| args.iter().any(|a| a == "-stream_loop"))
        .unwrap();
    let t = trim.iter().position(|a| a == "-t").unwrap();
    assert_eq!(trim[t + 1], "2");
}

#[tokio::test]
async fn test_loop_trim_falls_back_to_plain_trim() {
    let engine = Arc::new(MockEngine {
        fail_loop_trims: true,
        ..MockEngine::new()
    });
    let assembler = Assembler::new(engine.clone());

    assembler
        .assemble(&three_clips(), &beat_synced(120, None))
        .await
        .unwrap();

    let runs = engine.runs().await;
    // Every failed loop trim is retried without -stream_loop.
    let plain_trims = runs
        .iter()
        .filter(|args| {
            args.first().map(String::as_str) == Some("-t")
                && !args.iter().any(|a| a == "-stream_loop")
        })
        .count();
    assert_eq!(plain_trims, 3);
}

#[tokio::test]
async fn test_audio_mux_success() {
    let engine = Arc::new(MockEngine::new());
    let assembler = Assembler::new(engine.clone());

    let audio = Some(AudioSource::Bytes(b"MUSIC".to_vec()));
    let result = assembler
        .assemble(&three_clips(), &beat_synced(120, audio))
        .await
        .unwrap();

    assert!(result.audio_muxed);
    // Mock mux concatenates the video with the staged track bytes.
    assert_eq!(result.data, b"AAABBBCCCMUSIC");

    let runs = engine.runs().await;
    let mux = runs
        .iter()
        .find(|args| args.iter().any(|a| a == "-shortest"))
        .unwrap();
    assert!(mux.iter().any(|a| a == "bgm.mp3"));
    assert_eq!(mux.last().map(String::as_str), Some("output.mp4"));
}

#[tokio::test]
async fn test_mux_failure_degrades_to_video_only() {
    let engine = Arc::new(MockEngine {
        fail_mux: true,
        ..MockEngine::new()
    });
    let assembler = Assembler::new(engine.clone());

    let audio = Some(AudioSource::Bytes(b"MUSIC".to_vec()));
    let result = assembler
        .assemble(&three_clips(), &beat_synced(120, audio))
        .await
        .unwrap();

    assert!(!result.audio_muxed);
    // Same bytes as the pre-mux concatenated video, not an error.
    assert_eq!(result.data, b"AAABBBCCC");
}

#[tokio::test]
async fn test_audio_fetch_failure_degrades_to_video_only() {
    let engine = Arc::new(MockEngine::new());
    let assembler = Assembler::new(engine.clone());

    // Nothing listens on port 9; the fetch fails fast and is absorbed.
    let audio = Some(AudioSource::Url("http://127.0.0.1:9/track.mp3".to_string()));
    let result = assembler
        .assemble(&three_clips(), &beat_synced(120, audio))
        .await
        .unwrap();

    assert!(!result.audio_muxed);
    assert_eq!(result.data, b"AAABBBCCC");
}

#[tokio::test]
async fn test_cleanup_after_success() {
    let engine = Arc::new(MockEngine::new());
    let assembler = Assembler::new(engine.clone());

    let audio = Some(AudioSource::Bytes(b"MUSIC".to_vec()));
    assembler
        .assemble(&three_clips(), &beat_synced(120, audio))
        .await
        .unwrap();

    assert!(
        engine.remaining_entries().await.is_empty(),
        "working storage must be empty after assembly"
    );
}

#[tokio::test]
async fn test_cleanup_after_failure() {
    let engine = Arc::new(MockEngine {
        fail_concat: true,
        ..MockEngine::new()
    });
    let assembler = Assembler::new(engine.clone());

    let result = assembler
        .assemble(&three_clips(), &beat_synced(120, None))
        .await;
    assert!(matches!(result, Err(ApexError::EncodeFailed { .. })));
    assert!(
        engine.remaining_entries().await.is_empty(),
        "failed assembly must still release staged entries"
    );
}
