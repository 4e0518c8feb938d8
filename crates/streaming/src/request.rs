/// Ticket for one fetch issued by a cached layer.
///
/// Tickets grow monotonically per layer, so comparing two tickets tells
/// which fetch was issued later.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Request(pub u64);
