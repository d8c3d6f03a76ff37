// Tests for ffmpeg command construction across encoder paths

use ffwatch::config::{OutputFormat, SettingsFile};
use ffwatch::engine::hardware::{EncoderCapability, GpuVendor};
use ffwatch::engine::{EncodePath, EventSink, ToolPaths, build_transcode_cmd};
use std::path::Path;

fn settings_with(format: OutputFormat, file: SettingsFile) -> ffwatch::config::ConversionSettings {
    SettingsFile {
        output_format: format,
        ..file
    }
    .validate()
    .unwrap()
}

fn args_of(cmd: &std::process::Command) -> String {
    cmd.get_args()
        .map(|s| s.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

#[test]
fn test_software_path_uses_configured_codecs() {
    let settings = settings_with(OutputFormat::Mp4, SettingsFile::default());
    let (cmd, path) = build_transcode_cmd(
        &ToolPaths::default(),
        Path::new("/in/a.avi"),
        Path::new("/out/a.mp4"),
        &settings,
        EncoderCapability::default(),
        &EventSink::disconnected(),
    );

    assert_eq!(path, EncodePath::Software);
    assert_eq!(
        args_of(&cmd),
        "-y -i /in/a.avi -vcodec libx264 -acodec aac /out/a.mp4"
    );
}

#[test]
fn test_custom_codecs_pass_through_verbatim() {
    let settings = settings_with(
        OutputFormat::Mkv,
        SettingsFile {
            video_codec: Some("libx265".to_string()),
            audio_codec: "flac".to_string(),
            ..SettingsFile::default()
        },
    );
    let (cmd, _) = build_transcode_cmd(
        &ToolPaths::default(),
        Path::new("/in/a.mp4"),
        Path::new("/out/a.mkv"),
        &settings,
        EncoderCapability::default(),
        &EventSink::disconnected(),
    );

    assert_eq!(
        args_of(&cmd),
        "-y -i /in/a.mp4 -vcodec libx265 -acodec flac /out/a.mkv"
    );
}

#[test]
fn test_audio_only_target_drops_video_stream() {
    let settings = settings_with(
        OutputFormat::Mp3,
        SettingsFile {
            audio_codec: "libmp3lame".to_string(),
            ..SettingsFile::default()
        },
    );
    let (cmd, path) = build_transcode_cmd(
        &ToolPaths::default(),
        Path::new("/in/talk.mp4"),
        Path::new("/out/talk.mp3"),
        &settings,
        // Hardware availability must not matter on the audio path
        EncoderCapability {
            nvidia: true,
            intel: true,
            amd: true,
        },
        &EventSink::disconnected(),
    );

    assert_eq!(path, EncodePath::AudioOnly);
    assert_eq!(
        args_of(&cmd),
        "-y -i /in/talk.mp4 -vn -acodec libmp3lame /out/talk.mp3"
    );
}

#[test]
fn test_hardware_encoder_overrides_configured_video_codec() {
    let settings = settings_with(OutputFormat::Mp4, SettingsFile::default());
    let capability = EncoderCapability::from_encoder_listing(
        "V..... h264_nvenc  NVIDIA NVENC H.264 encoder\n\
         V..... hevc_nvenc  NVIDIA NVENC HEVC encoder\n",
    );
    let (cmd, path) = build_transcode_cmd(
        &ToolPaths::default(),
        Path::new("/in/a.mov"),
        Path::new("/out/a.mp4"),
        &settings,
        capability,
        &EventSink::disconnected(),
    );

    assert_eq!(path, EncodePath::Hardware(GpuVendor::Nvidia));
    assert_eq!(
        args_of(&cmd),
        "-y -i /in/a.mov -vcodec h264_nvenc -acodec aac /out/a.mp4"
    );
}
