use log::debug;

const TYPES: &str = include_str!("shaders/types.wgsl");
const HEADER: &str = include_str!("shaders/header.wgsl");
const SORT: &str = include_str!("shaders/sort.wgsl");
const ACCUMULATE: &str = include_str!("shaders/accumulate.wgsl");
const PRELUDE: &str = include_str!("shaders/prelude.wgsl");

/// Shader module with the name of the entry point to run.
pub type ShaderEntry<'a> = (&'a wgpu::ShaderModule, &'static str);

#[derive(Debug)]
pub struct Shaders {
    pub header: wgpu::ShaderModule,
    pub sort: wgpu::ShaderModule,
    pub accumulate: wgpu::ShaderModule,

    /// User-provided `primary` and `bounce` kernels, compiled together with
    /// the prelude.
    pub kernels: wgpu::ShaderModule,
}

impl Shaders {
    pub fn new(device: &wgpu::Device, kernels: &str) -> Self {
        Self {
            header: compile(device, "header", &[TYPES, HEADER]),
            sort: compile(device, "sort", &[TYPES, SORT]),
            accumulate: compile(device, "accumulate", &[TYPES, ACCUMULATE]),
            kernels: compile(device, "kernels", &[TYPES, PRELUDE, kernels]),
        }
    }
}

fn compile(
    device: &wgpu::Device,
    label: &str,
    sources: &[&str],
) -> wgpu::ShaderModule {
    debug!("Compiling shader: {label}");

    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(&format!("wavefront_{label}")),
        source: wgpu::ShaderSource::Wgsl(sources.join("\n").into()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu;

    fn assert_const(source: &str, name: &str, value: u32) {
        let decl = format!("const {name}: u32 = {value}u;");

        assert!(source.contains(&decl), "missing `{decl}`");
    }

    #[test]
    fn constants_match_host() {
        assert_const(TYPES, "RAY_WORKGROUP_SIZE", gpu::RAY_WORKGROUP_SIZE);
        assert_const(TYPES, "PASS_AOV", gpu::PassFlags::AOV);
        assert_const(TYPES, "PASS_LAST_BOUNCE", gpu::PassFlags::LAST_BOUNCE);

        assert_const(
            TYPES,
            "PASS_RUSSIAN_ROULETTE",
            gpu::PassFlags::RUSSIAN_ROULETTE,
        );

        assert_const(SORT, "SCAN_CAPACITY", gpu::SCAN_CAPACITY);
        assert_const(SORT, "SORT_WORKGROUP_SIZE", gpu::SORT_WORKGROUP_SIZE);
        assert_const(SORT, "MAX_SORT_BUCKETS", gpu::MAX_SORT_BUCKETS);
    }

    #[test]
    fn entry_points() {
        for entry in [
            "begin_sample",
            "begin_bounce",
            "end_bounce",
            "end_sample",
            "reset_samples",
        ] {
            assert!(HEADER.contains(&format!("fn {entry}(")));
        }

        for entry in ["scan_groups", "scan_sums", "scatter", "copy_back"] {
            assert!(SORT.contains(&format!("fn {entry}(")));
        }

        assert!(ACCUMULATE.contains("fn accumulate("));
    }
}
