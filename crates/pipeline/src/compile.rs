use std::borrow::Cow;

use wgpu::naga;

use crate::error::{PipelineError, PipelineResult};

/// Run the WGSL front end over `source` without touching the GPU.
///
/// Parsing and validating up front turns shader mistakes into a
/// [`PipelineError::ShaderCompile`] at load time instead of a late device
/// error, and gives tests a compile check that needs no adapter. The parsed
/// module comes back so device upload reuses it instead of parsing twice.
pub(crate) fn validate_wgsl(label: &str, source: &str) -> PipelineResult<naga::Module> {
    let module = naga::front::wgsl::parse_str(source).map_err(|err| {
        PipelineError::ShaderCompile(format!("{label}: {}", err.emit_to_string(source)))
    })?;

    let mut validator = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    );
    validator
        .validate(&module)
        .map_err(|err| PipelineError::ShaderCompile(format!("{label}: {}", err.into_inner())))?;
    Ok(module)
}

/// Validate `source` and hand the parsed module to the device.
pub(crate) fn build_shader_module(
    device: &wgpu::Device,
    label: &'static str,
    source: &str,
) -> PipelineResult<wgpu::ShaderModule> {
    let module = validate_wgsl(label, source)?;
    Ok(device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Naga(Cow::Owned(module)),
    }))
}
