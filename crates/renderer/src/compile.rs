use std::borrow::Cow;

use anyhow::Result;
use lens::params::{
    HIGHLIGHT_FALLOFF, HIGHLIGHT_POSITION, HIGHLIGHT_STRENGTH, VIGNETTE_END, VIGNETTE_FLOOR,
    VIGNETTE_START,
};
use wgpu::naga::ShaderStage;

pub(crate) const LENS_VERTEX_GLSL: &str = include_str!("../shaders/lens.vert");
pub(crate) const LENS_FRAGMENT_GLSL: &str = include_str!("../shaders/lens.frag");
pub(crate) const PRESENT_VERTEX_GLSL: &str = include_str!("../shaders/present.vert");
pub(crate) const PRESENT_FRAGMENT_GLSL: &str = include_str!("../shaders/present.frag");

/// Preprocessor defines for `lens.frag`, taken from the CPU lens model so the
/// two never drift apart.
pub(crate) fn lens_defines() -> Vec<(&'static str, String)> {
    vec![
        ("HIGHLIGHT_X", glsl_float(HIGHLIGHT_POSITION[0])),
        ("HIGHLIGHT_Y", glsl_float(HIGHLIGHT_POSITION[1])),
        ("HIGHLIGHT_FALLOFF", glsl_float(HIGHLIGHT_FALLOFF)),
        ("HIGHLIGHT_STRENGTH", glsl_float(HIGHLIGHT_STRENGTH)),
        ("VIGNETTE_START", glsl_float(VIGNETTE_START)),
        ("VIGNETTE_END", glsl_float(VIGNETTE_END)),
        ("VIGNETTE_FLOOR", glsl_float(VIGNETTE_FLOOR)),
    ]
}

/// `Debug` keeps the decimal point on whole numbers, which GLSL needs for a
/// float literal.
fn glsl_float(value: f32) -> String {
    format!("{value:?}")
}

/// Compiles one embedded GLSL stage.
pub(crate) fn compile_shader(
    device: &wgpu::Device,
    label: &str,
    source: &'static str,
    stage: ShaderStage,
    defines: &[(&'static str, String)],
) -> Result<wgpu::ShaderModule> {
    let defines: Vec<(&str, &str)> = defines
        .iter()
        .map(|(name, value)| (*name, value.as_str()))
        .collect();
    Ok(device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Borrowed(source),
            stage,
            defines: &defines,
        },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wgpu::naga::front::glsl::{Frontend, Options};
    use wgpu::naga::valid::{Capabilities, ValidationFlags, Validator};

    fn parse(source: &str, stage: ShaderStage, defines: &[(&'static str, String)]) {
        let mut options = Options::from(stage);
        for (name, value) in defines {
            options.defines.insert(name.to_string(), value.clone());
        }
        let module = Frontend::default()
            .parse(&options, source)
            .unwrap_or_else(|err| panic!("{stage:?} shader failed to parse: {err:?}"));
        Validator::new(ValidationFlags::all(), Capabilities::all())
            .validate(&module)
            .unwrap_or_else(|err| panic!("{stage:?} shader failed validation: {err:?}"));
    }

    #[test]
    fn lens_shaders_parse_and_validate() {
        parse(LENS_VERTEX_GLSL, ShaderStage::Vertex, &[]);
        parse(LENS_FRAGMENT_GLSL, ShaderStage::Fragment, &lens_defines());
    }

    #[test]
    fn present_shaders_parse_and_validate() {
        parse(PRESENT_VERTEX_GLSL, ShaderStage::Vertex, &[]);
        parse(PRESENT_FRAGMENT_GLSL, ShaderStage::Fragment, &[]);
    }

    #[test]
    fn lens_fragment_uses_every_define() {
        for (name, _) in lens_defines() {
            assert!(
                LENS_FRAGMENT_GLSL.contains(name),
                "lens.frag never reads {name}"
            );
        }
    }

    #[test]
    fn float_defines_keep_a_decimal_point() {
        assert_eq!(glsl_float(1.0), "1.0");
        assert_eq!(glsl_float(-0.15), "-0.15");
        assert_eq!(glsl_float(0.5), "0.5");
    }
}
