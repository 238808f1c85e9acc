use log::debug;

use crate::{gpu, DeviceBuffers, MappedUniformBuffer, Shaders};

macro_rules! passes {
    ([ $( $name:ident => $class:ident, )* ]) => {
        $( mod $name; )*
        $( pub use self::$name::*; )*

        #[derive(Debug)]
        pub struct DevicePasses {
            $( pub $name: $class, )*
        }

        impl DevicePasses {
            pub fn new(
                device: &wgpu::Device,
                shaders: &Shaders,
                scene: &wgpu::BindGroupLayout,
                camera: &MappedUniformBuffer<gpu::Camera>,
                buffers: &DeviceBuffers,
            ) -> Self {
                debug!("Initializing passes");

                Self {
                    $(
                        $name: $class::new(
                            device,
                            shaders,
                            scene,
                            camera,
                            buffers,
                        ),
                    )*
                }
            }
        }
    };
}

passes!([
    accumulation => AccumulationPass,
    bounce => BouncePass,
    header => HeaderPass,
    primary => PrimaryPass,
    sort => SortPass,
]);
