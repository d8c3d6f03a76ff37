//! Hardware encoder detection from the ffmpeg capability listing

use std::path::Path;
use std::process::Command;
use std::sync::OnceLock;

/// GPU vendors with known ffmpeg encoder families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpuVendor {
    Nvidia,
    Intel,
    Amd,
}

impl GpuVendor {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Nvidia => "NVIDIA NVENC",
            Self::Intel => "Intel Quick Sync",
            Self::Amd => "AMD AMF",
        }
    }
}

/// Encoder names ffmpeg exposes for one vendor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VendorEncoders {
    pub h264: &'static str,
    pub hevc: &'static str,
}

const NVENC: VendorEncoders = VendorEncoders {
    h264: "h264_nvenc",
    hevc: "hevc_nvenc",
};
const QSV: VendorEncoders = VendorEncoders {
    h264: "h264_qsv",
    hevc: "hevc_qsv",
};
const AMF: VendorEncoders = VendorEncoders {
    h264: "h264_amf",
    hevc: "hevc_amf",
};

/// Result of one capability probe: which vendors' encoders the ffmpeg
/// build advertises. Computed once and cached for the process
/// lifetime; hardware does not change mid-run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncoderCapability {
    pub nvidia: bool,
    pub intel: bool,
    pub amd: bool,
}

impl EncoderCapability {
    /// Parse an `ffmpeg -encoders` listing. A vendor counts as
    /// available when either of its encoders appears.
    pub fn from_encoder_listing(listing: &str) -> Self {
        let listing = listing.to_lowercase();
        Self {
            nvidia: listing.contains(NVENC.h264) || listing.contains(NVENC.hevc),
            intel: listing.contains(QSV.h264) || listing.contains(QSV.hevc),
            amd: listing.contains(AMF.h264) || listing.contains(AMF.hevc),
        }
    }

    /// Probe the transcoder once. Tool missing or a non-zero exit is
    /// a soft failure: an empty capability, never an error, since the
    /// software encoder path always remains available.
    pub fn detect(ffmpeg: &Path) -> Self {
        let output = Command::new(ffmpeg).args(["-hide_banner", "-encoders"]).output();
        match output {
            Ok(out) if out.status.success() => {
                Self::from_encoder_listing(&String::from_utf8_lossy(&out.stdout))
            }
            Ok(out) => {
                tracing::warn!("encoder detection failed with status {}", out.status);
                Self::default()
            }
            Err(e) => {
                tracing::warn!("encoder detection failed: {e}");
                Self::default()
            }
        }
    }

    /// Pick the vendor to use. Fixed priority order, deliberately not
    /// "best available": NVIDIA, then Intel, then AMD. Changing this
    /// order silently changes behavior for existing installations.
    pub fn select(&self) -> Option<(GpuVendor, VendorEncoders)> {
        if self.nvidia {
            Some((GpuVendor::Nvidia, NVENC))
        } else if self.intel {
            Some((GpuVendor::Intel, QSV))
        } else if self.amd {
            Some((GpuVendor::Amd, AMF))
        } else {
            None
        }
    }
}

static CAPABILITY_CACHE: OnceLock<EncoderCapability> = OnceLock::new();

/// Process-lifetime cached capability. The ffmpeg path is fixed for
/// the life of the process, so the first probe's result serves all
/// later callers.
pub fn cached_capability(ffmpeg: &Path) -> EncoderCapability {
    *CAPABILITY_CACHE.get_or_init(|| EncoderCapability::detect(ffmpeg))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_encoder_listing() {
        let listing = "\
 V....D h264_nvenc           NVIDIA NVENC H.264 encoder (codec h264)\n\
 V....D hevc_nvenc           NVIDIA NVENC hevc encoder (codec hevc)\n\
 V..... h264_qsv             H.264 (Intel Quick Sync Video acceleration) (codec h264)\n";
        let cap = EncoderCapability::from_encoder_listing(listing);
        assert!(cap.nvidia);
        assert!(cap.intel);
        assert!(!cap.amd);
    }

    #[test]
    fn test_single_encoder_is_enough() {
        let cap = EncoderCapability::from_encoder_listing("V HEVC_AMF amd encoder");
        assert!(cap.amd);
        assert!(!cap.nvidia);
    }

    #[test]
    fn test_selection_priority_order() {
        let all = EncoderCapability {
            nvidia: true,
            intel: true,
            amd: true,
        };
        assert_eq!(all.select().unwrap().0, GpuVendor::Nvidia);

        let no_nvidia = EncoderCapability {
            nvidia: false,
            intel: true,
            amd: true,
        };
        assert_eq!(no_nvidia.select().unwrap().0, GpuVendor::Intel);

        let amd_only = EncoderCapability {
            nvidia: false,
            intel: false,
            amd: true,
        };
        assert_eq!(amd_only.select().unwrap().0, GpuVendor::Amd);

        assert!(EncoderCapability::default().select().is_none());
    }

    #[test]
    fn test_selected_encoder_names() {
        let cap = EncoderCapability {
            nvidia: true,
            intel: false,
            amd: false,
        };
        let (_, encoders) = cap.select().unwrap();
        assert_eq!(encoders.h264, "h264_nvenc");
        assert_eq!(encoders.hevc, "hevc_nvenc");
    }

    #[test]
    fn test_probe_of_missing_tool_is_empty() {
        let cap = EncoderCapability::detect(Path::new("/nonexistent/ffmpeg"));
        assert_eq!(cap, EncoderCapability::default());
    }
}
