//! Hardware-accelerated decoding backends
//!
//! The set of device backends is closed: each [`HwAccelKind`] maps to an FFmpeg
//! device type, the pixel format decoded frames carry while they live in device
//! memory, and the host format they are transferred to.

use std::ptr;

use ffmpeg_next::ffi;
use ffmpeg_next::format::Pixel;
use serde::{Deserialize, Serialize};

/// Hardware acceleration backend requested for a decode session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HwAccelKind {
    /// Software decode
    #[default]
    None,
    /// NVIDIA CUDA / NVDEC
    Cuda,
    /// Linux VA-API
    Vaapi,
    /// Linux VDPAU
    Vdpau,
    /// macOS VideoToolbox
    VideoToolbox,
    /// Windows D3D11VA
    D3d11va,
    /// Windows DXVA2
    Dxva2,
    /// Intel QuickSync
    Qsv,
}

/// One row of the backend lookup table
#[derive(Debug, Clone, Copy)]
struct HwAccelEntry {
    kind: HwAccelKind,
    name: &'static str,
    device_type: ffi::AVHWDeviceType,
    device_format: Pixel,
    host_format: Pixel,
}

const HW_ACCEL_TABLE: &[HwAccelEntry] = &[
    HwAccelEntry {
        kind: HwAccelKind::None,
        name: "none",
        device_type: ffi::AVHWDeviceType::AV_HWDEVICE_TYPE_NONE,
        device_format: Pixel::None,
        host_format: Pixel::None,
    },
    HwAccelEntry {
        kind: HwAccelKind::Cuda,
        name: "cuda",
        device_type: ffi::AVHWDeviceType::AV_HWDEVICE_TYPE_CUDA,
        device_format: Pixel::CUDA,
        host_format: Pixel::NV12,
    },
    HwAccelEntry {
        kind: HwAccelKind::Vaapi,
        name: "vaapi",
        device_type: ffi::AVHWDeviceType::AV_HWDEVICE_TYPE_VAAPI,
        device_format: Pixel::VAAPI,
        host_format: Pixel::NV12,
    },
    HwAccelEntry {
        kind: HwAccelKind::Vdpau,
        name: "vdpau",
        device_type: ffi::AVHWDeviceType::AV_HWDEVICE_TYPE_VDPAU,
        device_format: Pixel::VDPAU,
        host_format: Pixel::YUV420P,
    },
    HwAccelEntry {
        kind: HwAccelKind::VideoToolbox,
        name: "videotoolbox",
        device_type: ffi::AVHWDeviceType::AV_HWDEVICE_TYPE_VIDEOTOOLBOX,
        device_format: Pixel::VIDEOTOOLBOX,
        host_format: Pixel::NV12,
    },
    HwAccelEntry {
        kind: HwAccelKind::D3d11va,
        name: "d3d11va",
        device_type: ffi::AVHWDeviceType::AV_HWDEVICE_TYPE_D3D11VA,
        device_format: Pixel::D3D11,
        host_format: Pixel::NV12,
    },
    HwAccelEntry {
        kind: HwAccelKind::Dxva2,
        name: "dxva2",
        device_type: ffi::AVHWDeviceType::AV_HWDEVICE_TYPE_DXVA2,
        device_format: Pixel::DXVA2_VLD,
        host_format: Pixel::NV12,
    },
    HwAccelEntry {
        kind: HwAccelKind::Qsv,
        name: "qsv",
        device_type: ffi::AVHWDeviceType::AV_HWDEVICE_TYPE_QSV,
        device_format: Pixel::QSV,
        host_format: Pixel::NV12,
    },
];

impl HwAccelKind {
    /// Every kind, in lookup-table order
    pub const ALL: [HwAccelKind; 8] = [
        HwAccelKind::None,
        HwAccelKind::Cuda,
        HwAccelKind::Vaapi,
        HwAccelKind::Vdpau,
        HwAccelKind::VideoToolbox,
        HwAccelKind::D3d11va,
        HwAccelKind::Dxva2,
        HwAccelKind::Qsv,
    ];

    fn entry(self) -> &'static HwAccelEntry {
        // Table covers every variant; index 0 is the software row.
        HW_ACCEL_TABLE
            .iter()
            .find(|e| e.kind == self)
            .unwrap_or(&HW_ACCEL_TABLE[0])
    }

    /// Short lowercase name, as used in settings files and on the command line
    pub fn name(self) -> &'static str {
        self.entry().name
    }

    /// Whether this kind requests a hardware device at all
    pub fn is_hardware(self) -> bool {
        self != HwAccelKind::None
    }

    /// FFmpeg device type backing this kind
    pub fn device_type(self) -> ffi::AVHWDeviceType {
        self.entry().device_type
    }

    /// Pixel format of frames that still live in device memory
    pub fn device_pixel_format(self) -> Pixel {
        self.entry().device_format
    }

    /// Pixel format frames have after a device-to-host transfer
    pub fn host_pixel_format(self) -> Pixel {
        self.entry().host_format
    }
}

impl std::fmt::Display for HwAccelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HwAccelKind::None => write!(f, "software"),
            other => write!(f, "{}", other.name()),
        }
    }
}

impl std::str::FromStr for HwAccelKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        if lowered == "software" || lowered == "sw" {
            return Ok(HwAccelKind::None);
        }
        HW_ACCEL_TABLE
            .iter()
            .find(|e| e.name == lowered)
            .map(|e| e.kind)
            .ok_or_else(|| {
                let names: Vec<&str> = HW_ACCEL_TABLE.iter().map(|e| e.name).collect();
                format!("unknown hwaccel '{}', expected one of: {}", s, names.join(", "))
            })
    }
}

/// Owned reference to an FFmpeg hardware device context
///
/// The codec context takes its own reference when the device is attached, so
/// dropping this wrapper only releases the session's reference.
pub(crate) struct HwDevice {
    ptr: *mut ffi::AVBufferRef,
    kind: HwAccelKind,
}

impl HwDevice {
    /// Create a device context of the given kind on the default device
    pub(crate) fn create(kind: HwAccelKind) -> Result<Self, String> {
        if !kind.is_hardware() {
            return Err("software decode has no hardware device".to_string());
        }

        let mut ptr: *mut ffi::AVBufferRef = ptr::null_mut();
        // SAFETY: `ptr` is a valid out-pointer; null device name and options
        // select the platform default device.
        let ret = unsafe {
            ffi::av_hwdevice_ctx_create(&mut ptr, kind.device_type(), ptr::null(), ptr::null_mut(), 0)
        };

        if ret < 0 || ptr.is_null() {
            return Err(format!(
                "could not create {} device: {}",
                kind,
                ffmpeg_next::Error::from(ret)
            ));
        }

        tracing::info!("Created hardware device context: {}", kind);
        Ok(Self { ptr, kind })
    }

    /// Attach a new reference of this device to an unopened codec context
    pub(crate) fn attach(&self, context: &mut ffmpeg_next::codec::context::Context) -> Result<(), String> {
        // SAFETY: `self.ptr` is a live device reference owned by this wrapper and
        // the codec context has not been opened yet.
        unsafe {
            let ctx = context.as_mut_ptr();
            let device_ref = ffi::av_buffer_ref(self.ptr);
            if device_ref.is_null() {
                return Err(format!("could not reference {} device", self.kind));
            }
            (*ctx).hw_device_ctx = device_ref;
        }
        Ok(())
    }

    pub(crate) fn kind(&self) -> HwAccelKind {
        self.kind
    }
}

impl Drop for HwDevice {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            // SAFETY: the pointer came from av_hwdevice_ctx_create and is
            // released exactly once here.
            unsafe {
                ffi::av_buffer_unref(&mut self.ptr);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_covers_every_kind() {
        for kind in HwAccelKind::ALL {
            assert_eq!(kind.entry().kind, kind, "missing table row for {:?}", kind);
        }
    }

    #[test]
    fn test_hwaccel_display() {
        assert_eq!(format!("{}", HwAccelKind::VideoToolbox), "videotoolbox");
        assert_eq!(format!("{}", HwAccelKind::None), "software");
    }

    #[test]
    fn test_hwaccel_parse() {
        assert_eq!("cuda".parse::<HwAccelKind>(), Ok(HwAccelKind::Cuda));
        assert_eq!("D3D11VA".parse::<HwAccelKind>(), Ok(HwAccelKind::D3d11va));
        assert_eq!("software".parse::<HwAccelKind>(), Ok(HwAccelKind::None));
        assert!("opengl".parse::<HwAccelKind>().is_err());
    }

    #[test]
    fn test_software_has_no_device() {
        assert!(!HwAccelKind::None.is_hardware());
        assert!(HwDevice::create(HwAccelKind::None).is_err());
        assert_eq!(HwAccelKind::None.device_pixel_format(), Pixel::None);
    }

    #[test]
    fn test_device_formats() {
        assert_eq!(HwAccelKind::Cuda.device_pixel_format(), Pixel::CUDA);
        assert_eq!(HwAccelKind::Vaapi.host_pixel_format(), Pixel::NV12);
    }
}
