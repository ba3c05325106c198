use cubix_utils::define_id;

define_id!(DefId);
