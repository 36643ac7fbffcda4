//! Faddeeva function w(z) = exp(-z^2) erfc(-iz).
//!
//! Algorithm 680 of Poppe and Wijers (ACM TOMS 16, 1990): a power series
//! around the origin, a Laplace continued fraction far from it, and a
//! truncated Taylor/continued fraction hybrid in between. Relative accuracy
//! is around 1e-14 in the upper half plane. The lower half plane is reached
//! through w(-z) = 2 exp(-z^2) - w(z) and overflows once the exponential does.

use num_complex::Complex64;

/// 2 / sqrt(pi)
const FACTOR: f64 = 1.128_379_167_095_512_573_88;

pub fn faddeeva(z: Complex64) -> Complex64 {
    let (x, y) = (z.re, z.im);
    let xabs = x.abs();
    let yabs = y.abs();
    let xs = xabs / 6.3;
    let ys = yabs / 4.4;
    let mut qrho = xs * xs + ys * ys;
    let xquad = xabs * xabs - yabs * yabs;
    let yquad = 2.0 * xabs * yabs;

    let mut u;
    let mut v;
    // exp(-z^2) for the series branch, reused by the reflection below
    let mut origin_phase = None;

    if qrho < 0.085_264 {
        qrho = (1.0 - 0.85 * ys) * qrho.sqrt();
        let n = (6.0 + 72.0 * qrho).round() as usize;
        let mut j = 2 * n + 1;
        let mut xsum = 1.0 / j as f64;
        let mut ysum = 0.0;
        for i in (1..=n).rev() {
            j -= 2;
            let fi = i as f64;
            let xaux = (xsum * xquad - ysum * yquad) / fi;
            ysum = (xsum * yquad + ysum * xquad) / fi;
            xsum = xaux + 1.0 / j as f64;
        }
        let u1 = -FACTOR * (xsum * yabs + ysum * xabs) + 1.0;
        let v1 = FACTOR * (xsum * xabs - ysum * yabs);
        let daux = (-xquad).exp();
        let u2 = daux * yquad.cos();
        let v2 = -daux * yquad.sin();
        origin_phase = Some((u2, v2));
        u = u1 * u2 - v1 * v2;
        v = u1 * v2 + v1 * u2;
    } else {
        let h;
        let kapn;
        let nu;
        if qrho > 1.0 {
            h = 0.0;
            kapn = 0usize;
            qrho = qrho.sqrt();
            nu = (3.0 + 1442.0 / (26.0 * qrho + 77.0)) as usize;
        } else {
            qrho = (1.0 - ys) * (1.0 - qrho).sqrt();
            h = 1.88 * qrho;
            kapn = (7.0 + 34.0 * qrho).round() as usize;
            nu = (16.0 + 26.0 * qrho).round() as usize;
        }
        let h2 = 2.0 * h;
        let truncated = h > 0.0;
        let mut qlambda = if truncated { h2.powi(kapn as i32) } else { 0.0 };

        let (mut rx, mut ry, mut sx, mut sy) = (0.0, 0.0, 0.0, 0.0);
        for n in (0..=nu).rev() {
            let np1 = (n + 1) as f64;
            let tx = yabs + h + np1 * rx;
            let ty = xabs - np1 * ry;
            let c = 0.5 / (tx * tx + ty * ty);
            rx = c * tx;
            ry = c * ty;
            if truncated && n <= kapn {
                let tx = qlambda + sx;
                sx = rx * tx - ry * sy;
                sy = ry * tx + rx * sy;
                qlambda /= h2;
            }
        }
        if truncated {
            u = FACTOR * sx;
            v = FACTOR * sy;
        } else {
            u = FACTOR * rx;
            v = FACTOR * ry;
        }
        if yabs == 0.0 {
            u = (-xabs * xabs).exp();
        }
    }

    if y < 0.0 {
        let (u2, v2) = match origin_phase {
            Some((u2, v2)) => (2.0 * u2, 2.0 * v2),
            None => {
                let w1 = 2.0 * (-xquad).exp();
                (w1 * yquad.cos(), -w1 * yquad.sin())
            }
        };
        u = u2 - u;
        v = v2 - v;
        if x > 0.0 {
            v = -v;
        }
    } else if x < 0.0 {
        v = -v;
    }
    Complex64::new(u, v)
}
