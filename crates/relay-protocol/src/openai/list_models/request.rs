/// `GET /v1/models` takes no body; kept as a marker type for symmetry with
/// the other request structs in this crate.
#[derive(Debug, Clone, Default)]
pub struct ListModelsRequest;
