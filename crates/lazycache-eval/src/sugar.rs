//! Operator overloads on `&LazyNode`.
//!
//! Each operator builds the same node as the explicit builder it delegates
//! to. `!` is logical negation (truthiness), matching [`UnaryOp::Not`].

use std::ops::{Add, BitAnd, BitOr, BitXor, Div, Mul, Neg, Not, Rem, Shl, Shr, Sub};

use lazycache_core::{BinaryOp, UnaryOp};

use crate::node::LazyNode;
use crate::operand::Operand;

macro_rules! binary_sugar {
    ($($trait:ident :: $method:ident => $op:ident),* $(,)?) => {
        $(
            impl<R: Into<Operand>> $trait<R> for &LazyNode {
                type Output = LazyNode;

                fn $method(self, rhs: R) -> LazyNode {
                    self.binary(BinaryOp::$op, rhs)
                }
            }
        )*
    };
}

binary_sugar! {
    Add::add => Add,
    Sub::sub => Sub,
    Mul::mul => Mul,
    Div::div => Div,
    Rem::rem => Mod,
    BitAnd::bitand => BitAnd,
    BitOr::bitor => BitOr,
    BitXor::bitxor => BitXor,
    Shl::shl => Shl,
    Shr::shr => Shr,
}

impl Neg for &LazyNode {
    type Output = LazyNode;

    fn neg(self) -> LazyNode {
        self.unary(UnaryOp::Neg)
    }
}

impl Not for &LazyNode {
    type Output = LazyNode;

    fn not(self) -> LazyNode {
        self.unary(UnaryOp::Not)
    }
}
