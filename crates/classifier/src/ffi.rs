//! C ABI for hosts that load the model once and classify bitmaps by handle

use std::ffi::CStr;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::ptr;

use bitmap_source::{BitmapError, BitmapInfo, BitmapSource, PixelFormat};
use inference_engine::{InferenceEngine, InferenceError, OnnxEngine, StatusCode};
use libc::{c_char, c_int};
use tracing::{error, info};

use crate::{Classifier, ClassifierConfig, ClassifyError};

/// Platform format codes (Android `ANDROID_BITMAP_FORMAT_*` values)
pub const IMGCLASS_FORMAT_RGBA_8888: c_int = 1;
pub const IMGCLASS_FORMAT_RGB_565: c_int = 4;
pub const IMGCLASS_FORMAT_RGBA_4444: c_int = 7;
pub const IMGCLASS_FORMAT_A_8: c_int = 8;
pub const IMGCLASS_FORMAT_RGBA_F16: c_int = 9;

/// Map a platform format code onto [`PixelFormat`]
pub fn pixel_format_from_raw(format: c_int) -> Option<PixelFormat> {
    match format {
        IMGCLASS_FORMAT_RGBA_8888 => Some(PixelFormat::Rgba8888),
        IMGCLASS_FORMAT_RGB_565 => Some(PixelFormat::Rgb565),
        IMGCLASS_FORMAT_RGBA_4444 => Some(PixelFormat::Rgba4444),
        IMGCLASS_FORMAT_A_8 => Some(PixelFormat::Alpha8),
        IMGCLASS_FORMAT_RGBA_F16 => Some(PixelFormat::RgbaF16),
        _ => None,
    }
}

/// C bitmap descriptor (caller keeps `pixels` valid for the call)
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CBitmap {
    pub pixels: *const u8,
    pub len: usize,
    pub width: u32,
    pub height: u32,
    pub format: c_int,
}

/// Loaded engine plus the classifier configured for it.
///
/// Opaque to C; created by `imgclass_load_model`, destroyed by
/// `imgclass_free_model`. The host must keep it alive across every in-flight
/// `imgclass_classify` call.
pub struct EngineHandle {
    engine: Box<dyn InferenceEngine + Send + Sync>,
    classifier: Classifier,
}

impl EngineHandle {
    pub fn new(engine: Box<dyn InferenceEngine + Send + Sync>, classifier: Classifier) -> Self {
        Self { engine, classifier }
    }

    /// Classify through the handle's engine
    pub fn classify<B: BitmapSource + ?Sized>(&self, bitmap: &B) -> Result<usize, ClassifyError> {
        self.classifier
            .classify(&*self.engine, bitmap)
            .map(|c| c.class_index)
    }

    /// Move onto the heap and hand ownership to C
    pub fn into_raw(self) -> *mut EngineHandle {
        Box::into_raw(Box::new(self))
    }
}

struct RawBitmap<'a> {
    bitmap: &'a CBitmap,
    format: PixelFormat,
}

impl BitmapSource for RawBitmap<'_> {
    fn info(&self) -> Result<BitmapInfo, BitmapError> {
        Ok(BitmapInfo {
            width: self.bitmap.width,
            height: self.bitmap.height,
            format: self.format,
        })
    }

    fn lock_pixels(&self) -> Result<&[u8], BitmapError> {
        if self.bitmap.pixels.is_null() {
            return Err(BitmapError::Lock("null pixel pointer".into()));
        }
        // SAFETY: non-null, and the caller guarantees `len` readable bytes for the call.
        Ok(unsafe { std::slice::from_raw_parts(self.bitmap.pixels, self.bitmap.len) })
    }

    fn unlock_pixels(&self) {}
}

fn load(model_path: &str, config_path: Option<&str>) -> Result<EngineHandle, ClassifyError> {
    let config = ClassifierConfig::load(config_path.map(Path::new))?;
    let classifier = Classifier::new(config)?;
    let engine = OnnxEngine::load(
        model_path,
        classifier.input_spec().clone(),
        classifier.output_spec().clone(),
    )?;
    info!("Engine handle ready for {}", model_path);
    Ok(EngineHandle::new(Box::new(engine), classifier))
}

unsafe fn optional_str<'a>(ptr: *const c_char) -> Result<Option<&'a str>, ClassifyError> {
    if ptr.is_null() {
        return Ok(None);
    }
    CStr::from_ptr(ptr)
        .to_str()
        .map(Some)
        .map_err(|e| ClassifyError::Config(e.to_string()))
}

/// Load an ONNX model and return an opaque handle, or null on failure.
///
/// `config_path` may be null to use defaults plus `IMGCLASS_*` overrides.
///
/// # Safety
/// Non-null arguments must be valid NUL-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn imgclass_load_model(
    model_path: *const c_char,
    config_path: *const c_char,
) -> *mut EngineHandle {
    let result = match (optional_str(model_path), optional_str(config_path)) {
        (Ok(Some(model)), Ok(config)) => load(model, config),
        (Ok(None), _) => Err(ClassifyError::Config("null model path".into())),
        (Err(e), _) | (_, Err(e)) => Err(e),
    };

    match result {
        Ok(handle) => handle.into_raw(),
        Err(e) => {
            error!("Failed to load model: {}", e);
            ptr::null_mut()
        }
    }
}

/// Release a handle from `imgclass_load_model`. Null is ignored.
///
/// # Safety
/// `handle` must come from `imgclass_load_model` and not be used afterwards.
#[no_mangle]
pub unsafe extern "C" fn imgclass_free_model(handle: *mut EngineHandle) {
    if !handle.is_null() {
        drop(Box::from_raw(handle));
    }
}

/// Classify a bitmap; returns a class index or a negative error code.
///
/// # Safety
/// `handle` must be null or a live handle; `bitmap` must be null or point to
/// a descriptor whose `pixels` are readable for `len` bytes.
#[no_mangle]
pub unsafe extern "C" fn imgclass_classify(handle: *const EngineHandle, bitmap: *const CBitmap) -> c_int {
    let Some(handle) = handle.as_ref() else {
        return ClassifyError::InvalidEngine.code();
    };
    let Some(bitmap) = bitmap.as_ref() else {
        return ClassifyError::Acquisition(BitmapError::Info("null bitmap".into())).code();
    };
    let Some(format) = pixel_format_from_raw(bitmap.format) else {
        return ClassifyError::Format {
            actual: format!("raw format {}", bitmap.format),
            expected: handle.classifier.config().pixel_format,
        }
        .code();
    };

    // Unwinding across the C boundary is undefined; a panicking engine reports as an engine failure
    let result = panic::catch_unwind(AssertUnwindSafe(|| handle.classify(&RawBitmap { bitmap, format })))
        .unwrap_or_else(|_| {
            error!("Engine panicked during classification");
            Err(ClassifyError::Inference(InferenceError::EngineFailed {
                code: StatusCode::RuntimeError,
                information: "engine panicked".to_string(),
            }))
        });

    match result {
        Ok(index) => c_int::try_from(index).unwrap_or(ClassifyError::EmptyOutput.code()),
        Err(e) => e.code(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inference_engine::{EngineStatus, TensorView, TensorViewMut};
    use std::ffi::CString;

    struct PeakEngine(usize);

    impl InferenceEngine for PeakEngine {
        fn run(&self, _input: TensorView<'_>, output: TensorViewMut<'_>) -> EngineStatus {
            output.data[self.0] = 3.0;
            EngineStatus::success()
        }
    }

    fn handle(peak: usize) -> *mut EngineHandle {
        let classifier = Classifier::new(ClassifierConfig::with_resolution(8, 8)).unwrap();
        EngineHandle::new(Box::new(PeakEngine(peak)), classifier).into_raw()
    }

    fn descriptor(pixels: &[u8], width: u32, height: u32, format: c_int) -> CBitmap {
        CBitmap {
            pixels: pixels.as_ptr(),
            len: pixels.len(),
            width,
            height,
            format,
        }
    }

    #[test]
    fn test_classify_through_handle() {
        let pixels = vec![90u8; 8 * 8 * 4];
        let raw = handle(42);
        let bitmap = descriptor(&pixels, 8, 8, IMGCLASS_FORMAT_RGBA_8888);

        let index = unsafe { imgclass_classify(raw, &bitmap) };
        unsafe { imgclass_free_model(raw) };
        assert_eq!(index, 42);
    }

    #[test]
    fn test_null_handle() {
        let pixels = vec![0u8; 8 * 8 * 4];
        let bitmap = descriptor(&pixels, 8, 8, IMGCLASS_FORMAT_RGBA_8888);
        assert_eq!(unsafe { imgclass_classify(ptr::null(), &bitmap) }, -6);
    }

    #[test]
    fn test_sentinels() {
        let raw = handle(1);
        let pixels = vec![0u8; 8 * 8 * 4];

        let wrong_format = descriptor(&pixels, 8, 8, IMGCLASS_FORMAT_RGB_565);
        let unknown_format = descriptor(&pixels, 8, 8, 99);
        let wrong_size = descriptor(&pixels, 4, 16, IMGCLASS_FORMAT_RGBA_8888);
        let null_pixels = CBitmap {
            pixels: ptr::null(),
            ..descriptor(&pixels, 8, 8, IMGCLASS_FORMAT_RGBA_8888)
        };

        unsafe {
            assert_eq!(imgclass_classify(raw, &wrong_format), -2);
            assert_eq!(imgclass_classify(raw, &unknown_format), -2);
            assert_eq!(imgclass_classify(raw, &wrong_size), -10);
            assert_eq!(imgclass_classify(raw, &null_pixels), -3);
            assert_eq!(imgclass_classify(raw, ptr::null()), -1);
            imgclass_free_model(raw);
        }
    }

    struct PanickingEngine;

    impl InferenceEngine for PanickingEngine {
        fn run(&self, _input: TensorView<'_>, _output: TensorViewMut<'_>) -> EngineStatus {
            panic!("backend crashed");
        }
    }

    #[test]
    fn test_engine_panic_reports_engine_failure() {
        let classifier = Classifier::new(ClassifierConfig::with_resolution(8, 8)).unwrap();
        let raw = EngineHandle::new(Box::new(PanickingEngine), classifier).into_raw();
        let pixels = vec![0u8; 8 * 8 * 4];
        let bitmap = descriptor(&pixels, 8, 8, IMGCLASS_FORMAT_RGBA_8888);

        let code = unsafe { imgclass_classify(raw, &bitmap) };
        // Handle stays usable after the panic
        let again = unsafe { imgclass_classify(raw, &bitmap) };
        unsafe { imgclass_free_model(raw) };

        assert_eq!(code, -5);
        assert_eq!(again, -5);
    }

    #[test]
    fn test_load_failures_return_null() {
        let missing = CString::new("/nonexistent/model.onnx").unwrap();
        unsafe {
            assert!(imgclass_load_model(ptr::null(), ptr::null()).is_null());
            assert!(imgclass_load_model(missing.as_ptr(), ptr::null()).is_null());
            imgclass_free_model(ptr::null_mut());
        }
    }
}
