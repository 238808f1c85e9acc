use crate::DoubleBufferedBindable;

/// Bind group prebuilt for both queue parities.
///
/// Bounce and sort passes read rays from one queue and emit into the other,
/// and the roles swap after every bounce. Since a `wgpu::BindGroup` can't be
/// rebound, each group is created twice: variant `A` binds queue A as the
/// source and queue B as the target, variant `B` the other way round. The
/// schedule then only decides which variant to set, see [`Self::get()`].
///
/// Resources that don't depend on the parity, such as the header,
/// appear identically in both variants.
#[derive(Debug)]
pub struct BindGroup {
    bind_group_a: wgpu::BindGroup,
    bind_group_b: wgpu::BindGroup,
    bind_group_layout: wgpu::BindGroupLayout,
}

impl BindGroup {
    pub fn builder<'a>(label: impl ToString) -> BindGroupBuilder<'a> {
        BindGroupBuilder {
            label: label.to_string(),
            layouts: Default::default(),
            resources: Default::default(),
        }
    }

    /// Returns the variant for the current source queue: `B` when
    /// `alternate` (queue B is the source), `A` otherwise.
    pub fn get(&self, alternate: bool) -> &wgpu::BindGroup {
        if alternate {
            &self.bind_group_b
        } else {
            &self.bind_group_a
        }
    }

    pub fn layout(&self) -> &wgpu::BindGroupLayout {
        &self.bind_group_layout
    }
}

pub struct BindGroupBuilder<'a> {
    label: String,
    layouts: Vec<wgpu::BindGroupLayoutEntry>,
    resources: Vec<[wgpu::BindingResource<'a>; 2]>,
}

impl<'a> BindGroupBuilder<'a> {
    /// Appends `item`'s bindings; each contributes one resource per variant.
    pub fn add(mut self, item: &'a dyn DoubleBufferedBindable) -> Self {
        for (layout, resources) in item.bind(self.resources.len() as u32) {
            self.layouts.push(layout);
            self.resources.push(resources);
        }

        self
    }

    pub fn build(self, device: &wgpu::Device) -> BindGroup {
        let label = format!("wavefront_{}", self.label);

        let bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(&format!("{label}_layout")),
                entries: &self.layouts,
            });

        let (entries_a, entries_b): (Vec<_>, Vec<_>) = self
            .resources
            .into_iter()
            .enumerate()
            .map(|(binding, resources)| {
                let [entry_a, entry_b] =
                    resources.map(|resource| wgpu::BindGroupEntry {
                        binding: binding as _,
                        resource,
                    });

                (entry_a, entry_b)
            })
            .unzip();

        let [bind_group_a, bind_group_b] =
            [("a", entries_a), ("b", entries_b)].map(|(variant, entries)| {
                device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some(&format!("{label}_{variant}")),
                    layout: &bind_group_layout,
                    entries: &entries,
                })
            });

        BindGroup {
            bind_group_a,
            bind_group_b,
            bind_group_layout,
        }
    }
}
