//! Transcoder argument construction.
//!
//! One variant per target container: H.264 for mp4 and mkv, MPEG-4 part 2
//! for avi, AAC audio everywhere. The scale filter pins the target height
//! and lets the width follow the source aspect, forced even for the codecs.

use std::path::Path;

use vc_core::config::TranscodeConfig;
use vc_core::{Container, Resolution};

/// Build the full ffmpeg argument list for one transcode.
pub fn transcode_args(
    input: &Path,
    output: &Path,
    resolution: Resolution,
    container: Container,
    config: &TranscodeConfig,
) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "-y".into(),
        "-i".into(),
        input.to_string_lossy().into_owned(),
        "-vf".into(),
        format!("scale=-2:{}", resolution.height()),
    ];

    match container {
        Container::Mp4 => {
            args.extend([
                "-c:v".into(),
                "libx264".into(),
                "-crf".into(),
                config.video_crf.to_string(),
                "-preset".into(),
                config.video_preset.clone(),
                "-movflags".into(),
                "+faststart".into(),
            ]);
        }
        Container::Mkv => {
            args.extend([
                "-c:v".into(),
                "libx264".into(),
                "-crf".into(),
                config.video_crf.to_string(),
            ]);
        }
        Container::Avi => {
            args.extend(["-c:v".into(), "mpeg4".into(), "-q:v".into(), "6".into()]);
        }
    }

    args.extend(["-c:a".into(), "aac".into()]);
    args.push(output.to_string_lossy().into_owned());
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn args_for(container: Container) -> Vec<String> {
        transcode_args(
            &PathBuf::from("/v/Heat-1080p.mkv"),
            &PathBuf::from("/v/Heat-480p.out"),
            Resolution::P480,
            container,
            &TranscodeConfig::default(),
        )
    }

    #[test]
    fn overwrite_and_scale_are_always_present() {
        for container in Container::ALL {
            let args = args_for(container);
            assert_eq!(args[0], "-y");
            assert!(args.contains(&"scale=-2:480".to_string()));
            assert_eq!(args.last().unwrap(), "/v/Heat-480p.out");
        }
    }

    #[test]
    fn mp4_uses_x264_with_preset_and_faststart() {
        let args = args_for(Container::Mp4);
        assert!(args.contains(&"libx264".to_string()));
        assert!(args.contains(&"medium".to_string()));
        assert!(args.contains(&"+faststart".to_string()));
    }

    #[test]
    fn mkv_uses_x264_without_faststart() {
        let args = args_for(Container::Mkv);
        assert!(args.contains(&"libx264".to_string()));
        assert!(!args.contains(&"+faststart".to_string()));
    }

    #[test]
    fn avi_uses_mpeg4_fixed_quality() {
        let args = args_for(Container::Avi);
        assert!(args.contains(&"mpeg4".to_string()));
        let q_pos = args.iter().position(|a| a == "-q:v").unwrap();
        assert_eq!(args[q_pos + 1], "6");
        assert!(!args.contains(&"-crf".to_string()));
    }

    #[test]
    fn audio_is_always_aac() {
        for container in Container::ALL {
            let args = args_for(container);
            let a_pos = args.iter().position(|a| a == "-c:a").unwrap();
            assert_eq!(args[a_pos + 1], "aac");
        }
    }

    #[test]
    fn crf_follows_config() {
        let config = TranscodeConfig {
            video_crf: 18,
            ..TranscodeConfig::default()
        };
        let args = transcode_args(
            &PathBuf::from("/v/a-720p.mkv"),
            &PathBuf::from("/v/a-240p.mkv"),
            Resolution::P240,
            Container::Mkv,
            &config,
        );
        let crf_pos = args.iter().position(|a| a == "-crf").unwrap();
        assert_eq!(args[crf_pos + 1], "18");
    }
}
