//! Probability distributions: binomial, Poisson, normal, Student's t, chi-squared

pub mod binomial;
pub mod chi;
pub mod normal;
pub mod poisson;
pub mod t;

pub use binomial::{BinomDist, BinomInv, BinomInvp};
pub use chi::{ChisqDist, ChisqInv};
pub use normal::{NormDist, NormInv};
pub use poisson::{PoissonDist, PoissonInv, PoissonInvp};
pub use t::{TDist, TInv};
