//! Primitive operations of the graph IR.

/// Declares [`IrOperation`] together with its variant table and arities.
macro_rules! operations {
    ($($name:ident = $arity:literal),* $(,)?) => {
        /// Primitive operation: constants, conversions, arithmetic, comparisons
        /// and runtime checks.
        #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
        pub enum IrOperation {
            $($name,)*
        }

        impl IrOperation {
            /// Every operation, in wire order.
            pub const ALL: &'static [IrOperation] = &[$(IrOperation::$name,)*];

            /// Number of stack operands the operation consumes.
            pub const fn arity(self) -> usize {
                match self {
                    $(IrOperation::$name => $arity,)*
                }
            }
        }
    };
}

operations! {
    Void = 0,
    Null = 0,
    Unreachable = 0,
    ThrowNpe = 0,
    ThrowCce = 0,
    ThrowAioobe = 0,

    BooleanToInt = 1,
    ByteToInt = 1,
    ShortToInt = 1,
    CharToInt = 1,
    IntToBoolean = 1,
    IntToByte = 1,
    IntToShort = 1,
    IntToChar = 1,
    IntToLong = 1,
    IntToFloat = 1,
    IntToDouble = 1,
    LongToInt = 1,
    LongToFloat = 1,
    LongToDouble = 1,
    FloatToInt = 1,
    FloatToLong = 1,
    FloatToDouble = 1,
    DoubleToInt = 1,
    DoubleToLong = 1,
    DoubleToFloat = 1,

    ArrayLength = 1,
    Ignore = 1,
    NullCheck = 1,
    Not = 1,
    IntInvert = 1,
    LongInvert = 1,
    IntNegate = 1,
    LongNegate = 1,
    FloatNegate = 1,
    DoubleNegate = 1,

    IntAdd = 2,
    IntSub = 2,
    IntMul = 2,
    IntDiv = 2,
    IntRem = 2,
    LongAdd = 2,
    LongSub = 2,
    LongMul = 2,
    LongDiv = 2,
    LongRem = 2,
    LongCompare = 2,
    FloatAdd = 2,
    FloatSub = 2,
    FloatMul = 2,
    FloatDiv = 2,
    FloatRem = 2,
    FloatCompare = 2,
    DoubleAdd = 2,
    DoubleSub = 2,
    DoubleMul = 2,
    DoubleDiv = 2,
    DoubleRem = 2,
    DoubleCompare = 2,
    IntEq = 2,
    IntNe = 2,
    IntLt = 2,
    IntLe = 2,
    IntGt = 2,
    IntGe = 2,
    RefEq = 2,
    RefNe = 2,
    IntAnd = 2,
    IntOr = 2,
    IntXor = 2,
    IntShl = 2,
    IntShr = 2,
    IntShru = 2,
    LongAnd = 2,
    LongOr = 2,
    LongXor = 2,
    LongShl = 2,
    LongShr = 2,
    LongShru = 2,
    LogicalAnd = 2,
    LogicalOr = 2,
    UpperBoundCheck = 2,
    LowerBoundCheck = 1,
}

impl IrOperation {
    /// Whether the operation has an effect that must stay in program order.
    pub const fn is_ordered(self) -> bool {
        matches!(
            self,
            IrOperation::Unreachable
                | IrOperation::ThrowNpe
                | IrOperation::ThrowCce
                | IrOperation::ThrowAioobe
        )
    }

    /// Position in [`ALL`](Self::ALL).
    pub const fn ordinal(self) -> usize {
        self as usize
    }
}
