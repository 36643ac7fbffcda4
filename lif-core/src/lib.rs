//! lif-core: mean-field numerics for populations of leaky integrate-and-fire neurons
//!
//! Bottom-up:
//! - special functions (Faddeeva, erfcx, Dawson, parabolic cylinder)
//! - Gauss-Legendre quadrature with adaptive order
//! - Siegert rates for delta and exponentially filtered synapses
//! - derivatives and transfer functions
//!
//! All quantities are in SI units (s, V, Hz, rad/s).

pub mod error;
pub mod faddeeva;
pub mod special;
pub mod parabolic;
pub mod quadrature;
pub mod params;
pub mod siegert;
pub mod colored;
pub mod derivative;
pub mod transfer;

// Re-exports
pub use error::{MeanFieldError, MeanFieldResult};
pub use faddeeva::faddeeva;
pub use special::{dawson, erf, erfc, erfcx};
pub use parabolic::{d2_psi, d_psi, psi};
pub use quadrature::{erfcx_integral, find_order, GaussLegendre, QuadratureConfig};
pub use params::{equalize_shape, InputStatistics, NeuronParams, Populations};
pub use siegert::{delta_firing_rates, Domain};
pub use colored::{firing_rates, nu0_dphi, shift_firing_rates, taylor_firing_rates, Method, ALPHA};
pub use derivative::{delta_derivative, derivative, taylor_derivative};
pub use transfer::{transfer_function, TransferOptions};
