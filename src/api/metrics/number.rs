use std::fmt;
use std::sync::atomic::{self, AtomicI64, AtomicU64};

/// Number represents either an integral or a floating point value. It
/// needs to be accompanied with a source of NumberKind that describes
/// the actual type of the value stored within Number.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Number(u64);

impl Number {
    /// Interpret the stored bits as an `i64`.
    pub fn to_i64(self) -> i64 {
        self.0 as i64
    }

    /// Interpret the stored bits as an `f64`.
    pub fn to_f64(self) -> f64 {
        f64::from_bits(self.0)
    }

    /// Whether the value is NaN. Only floating point values can be.
    pub fn is_nan(self, kind: NumberKind) -> bool {
        kind == NumberKind::F64 && self.to_f64().is_nan()
    }

    /// Whether the value is strictly below zero.
    pub fn is_negative(self, kind: NumberKind) -> bool {
        match kind {
            NumberKind::I64 => self.to_i64() < 0,
            NumberKind::F64 => self.to_f64() < 0.0,
        }
    }

    /// Pair the number with its kind for display.
    pub fn display(self, kind: NumberKind) -> DisplayNumber {
        DisplayNumber { number: self, kind }
    }
}

impl From<i64> for Number {
    fn from(i: i64) -> Self {
        Number(i as u64)
    }
}

impl From<f64> for Number {
    fn from(f: f64) -> Self {
        Number(f.to_bits())
    }
}

/// A `Number` together with its kind, formatted as the underlying value.
#[derive(Clone, Copy, Debug)]
pub struct DisplayNumber {
    number: Number,
    kind: NumberKind,
}

impl fmt::Display for DisplayNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            NumberKind::I64 => self.number.to_i64().fmt(f),
            NumberKind::F64 => self.number.to_f64().fmt(f),
        }
    }
}

/// Kinds of numeric values an instrument may be declared over.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NumberKind {
    /// A signed 64-bit integer.
    I64,
    /// A 64-bit floating point value.
    F64,
}

/// A primitive numeric type measurements may be recorded with.
///
/// Each implementation names the lock-free cell that stores it, so that the
/// aggregators are monomorphized per numeric kind and the update path never
/// dispatches on the kind at runtime.
pub trait Numeric: Copy + Default + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// The atomic cell holding a value of this type.
    type Atomic: AtomicNumber<Self>;

    /// The kind tag carried by descriptors of instruments over this type.
    const KIND: NumberKind;

    /// `self - other`, wrapping on integer overflow.
    fn difference(self, other: Self) -> Self;

    /// Erase the type into a `Number`.
    fn to_number(self) -> Number;

    /// Recover a value from a `Number` of this kind.
    fn from_number(number: Number) -> Self;
}

impl Numeric for i64 {
    type Atomic = AtomicI64Number;
    const KIND: NumberKind = NumberKind::I64;

    fn difference(self, other: Self) -> Self {
        self.wrapping_sub(other)
    }

    fn to_number(self) -> Number {
        self.into()
    }

    fn from_number(number: Number) -> Self {
        number.to_i64()
    }
}

impl Numeric for f64 {
    type Atomic = AtomicF64Number;
    const KIND: NumberKind = NumberKind::F64;

    fn difference(self, other: Self) -> Self {
        self - other
    }

    fn to_number(self) -> Number {
        self.into()
    }

    fn from_number(number: Number) -> Self {
        number.to_f64()
    }
}

/// Lock-free storage for one `Numeric` value.
pub trait AtomicNumber<N>: fmt::Debug + Default + Send + Sync {
    /// Create a cell holding `value`.
    fn new(value: N) -> Self;

    /// Read the current value.
    fn load(&self) -> N;

    /// Overwrite the current value.
    fn store(&self, value: N);

    /// Atomically add `value` to the current value.
    fn add(&self, value: N);

    /// Atomically replace the current value, returning the previous one.
    fn swap(&self, value: N) -> N;
}

/// Atomic `i64` cell backed by a native atomic add.
#[derive(Debug, Default)]
pub struct AtomicI64Number(AtomicI64);

impl AtomicNumber<i64> for AtomicI64Number {
    fn new(value: i64) -> Self {
        AtomicI64Number(AtomicI64::new(value))
    }

    fn load(&self) -> i64 {
        self.0.load(atomic::Ordering::Acquire)
    }

    fn store(&self, value: i64) {
        self.0.store(value, atomic::Ordering::Release)
    }

    fn add(&self, value: i64) {
        self.0.fetch_add(value, atomic::Ordering::AcqRel);
    }

    fn swap(&self, value: i64) -> i64 {
        self.0.swap(value, atomic::Ordering::AcqRel)
    }
}

/// Atomic `f64` cell. There is no native floating point atomic add, so
/// additions retry a compare-and-swap on the bit pattern.
#[derive(Debug)]
pub struct AtomicF64Number(AtomicU64);

impl Default for AtomicF64Number {
    fn default() -> Self {
        AtomicF64Number(AtomicU64::new(0.0f64.to_bits()))
    }
}

impl AtomicNumber<f64> for AtomicF64Number {
    fn new(value: f64) -> Self {
        AtomicF64Number(AtomicU64::new(value.to_bits()))
    }

    fn load(&self) -> f64 {
        f64::from_bits(self.0.load(atomic::Ordering::Acquire))
    }

    fn store(&self, value: f64) {
        self.0.store(value.to_bits(), atomic::Ordering::Release)
    }

    fn add(&self, value: f64) {
        let mut current = self.0.load(atomic::Ordering::Acquire);
        loop {
            let new = (f64::from_bits(current) + value).to_bits();
            match self.0.compare_exchange_weak(
                current,
                new,
                atomic::Ordering::AcqRel,
                atomic::Ordering::Acquire,
            ) {
                Ok(_) => return,
                Err(actual) => current = actual,
            }
        }
    }

    fn swap(&self, value: f64) -> f64 {
        f64::from_bits(self.0.swap(value.to_bits(), atomic::Ordering::AcqRel))
    }
}
