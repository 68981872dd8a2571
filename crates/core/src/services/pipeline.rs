use crate::model::{BinaryModule, TypeRefId};
use crate::services::handlers::{HandlerContext, InstructionHandler};

/// Offers every type reference and instruction of a module to a handler set.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecursiveRewriter;

impl RecursiveRewriter {
    /// Run the handlers over `module` in registration order.
    ///
    /// Type references are visited first, using the ids present when the pass
    /// starts, then every instruction of every method body in definition
    /// order. Each handler sees the changes made by the ones before it.
    /// Returns whether any handler modified the module.
    pub fn rewrite_module(
        module: &mut BinaryModule,
        ctx: &HandlerContext<'_>,
        handlers: &mut [Box<dyn InstructionHandler>],
    ) -> bool {
        let mut changed = false;

        let type_refs: Vec<TypeRefId> = module.type_refs().map(|(id, _)| id).collect();
        for id in type_refs {
            for handler in handlers.iter_mut() {
                changed |= handler.handle_type(ctx, module, id);
            }
        }

        for at in module.instruction_locations() {
            for handler in handlers.iter_mut() {
                changed |= handler.handle_instruction(ctx, module, at);
            }
        }

        tracing::trace!(module = %module.name, handlers = handlers.len(), changed, "rewrite pass finished");
        changed
    }
}
