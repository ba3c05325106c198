use cubix_utils::define_id;

define_id!(SourceId);

impl Default for SourceId {
    fn default() -> Self {
        Self::from_raw(0)
    }
}
