//! Vec3: Vector in 3D space

/// Vector in 3D space
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Vec3<T> {
    /// X component
    pub x: T,
    /// Y component
    pub y: T,
    /// Z component
    pub z: T,
}

impl<T: Default> Default for Vec3<T> {
    fn default() -> Self {
        Vec3 { x: T::default(),
               y: T::default(),
               z: T::default(), }
    }
}

impl<T> From<[T; 3]> for Vec3<T> where T: Copy
{
    fn from(arr: [T; 3]) -> Self {
        Vec3 { x: arr[0],
               y: arr[1],
               z: arr[2], }
    }
}

/// Scale
pub trait Scale<RHS = Self> {
    /// Scale vector
    fn scale(self, rhs: RHS) -> Self;
}

impl<T> Scale<T> for Vec3<T> where T: core::ops::Mul<T, Output = T> + Copy
{
    fn scale(self, rhs: T) -> Vec3<T> {
        Vec3 { x: self.x * rhs,
               y: self.y * rhs,
               z: self.z * rhs, }
    }
}
