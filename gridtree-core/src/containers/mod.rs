mod point_set;
pub use self::point_set::*;
