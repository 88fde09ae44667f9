mod window_limit;

pub use window_limit::*;

/// Declares an event with pre-registered metric handles.
///
/// `Event.register()` resolves every metric once against the installed recorder and
/// returns an `EventHandle` whose `emit` records into those handles.
#[macro_export]
macro_rules! registered_event {
    (
        $event:ident => {
            $($field:ident: $type:ty = $value:expr,)*
        }

        fn emit(&$slf:ident, $data_name:ident: $data:ty)
            $emit_body:block
    ) => {
        ::paste::paste! {
            #[derive(Clone, Copy, Debug, Default)]
            pub struct $event;

            #[derive(Clone)]
            pub struct [<$event Handle>] {
                $($field: $type,)*
            }

            impl $event {
                pub fn register(self) -> [<$event Handle>] {
                    [<$event Handle>] {
                        $($field: $value,)*
                    }
                }
            }

            impl [<$event Handle>] {
                pub fn emit(&$slf, $data_name: $data)
                    $emit_body
            }
        }
    };
}
