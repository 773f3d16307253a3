mod bounds;
pub use self::bounds::*;

mod octant;
pub use self::octant::*;
