use std::any::Any;

/// Message routed to systems through `Scene::handle_message`.
///
/// The scene never inspects the payload; systems downcast what they
/// understand and ignore the rest.
pub trait Message: Any + Send + Sync {
    /// Downcast to concrete type
    fn as_any(&self) -> &dyn Any;

    /// Message name for debugging
    fn message_name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

impl dyn Message {
    pub fn is<M: Message>(&self) -> bool {
        self.as_any().is::<M>()
    }

    pub fn downcast_ref<M: Message>(&self) -> Option<&M> {
        self.as_any().downcast_ref::<M>()
    }
}
