//! Wavelength/frequency conversions and the DWDM channel grid.
//!
//! Conventions: wavelengths in nanometers, frequencies in terahertz, power
//! in dBm. Adapters whose wire dialect differs (GHz, watts) convert at the
//! boundary so everything above the capability traits speaks one language.

/// Speed of light in vacuum, m/s.
pub const SPEED_OF_LIGHT_M_S: f64 = 299_792_458.0;

/// ITU-T G.694.1 anchor frequency, THz (channel 0 of the 100 GHz grid).
pub const ITU_ANCHOR_THZ: f64 = 190.0;

/// 100 GHz grid spacing, THz.
pub const ITU_GRID_SPACING_THZ: f64 = 0.1;

/// Nominal DWDM channel spacing near 1550 nm, in nm (100 GHz ≈ 0.8 nm).
pub const DWDM_CHANNEL_SPACING_NM: f64 = 0.8;

/// Convert a vacuum wavelength in nm to frequency in THz.
pub fn wavelength_nm_to_frequency_thz(wavelength_nm: f64) -> f64 {
    SPEED_OF_LIGHT_M_S / (wavelength_nm * 1e-9) / 1e12
}

/// Convert a frequency in THz to vacuum wavelength in nm.
pub fn frequency_thz_to_wavelength_nm(frequency_thz: f64) -> f64 {
    SPEED_OF_LIGHT_M_S / (frequency_thz * 1e12) / 1e-9
}

/// A channel on the ITU-T G.694.1 100 GHz DWDM grid.
///
/// Channel `n` sits at `190.0 + 0.1·n` THz; the usable C-band covers
/// roughly channels 11 (191.1 THz, ~1568.8 nm) through 61 (196.1 THz,
/// ~1528.8 nm).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItuChannel(pub u8);

impl ItuChannel {
    /// Center frequency of this channel, THz.
    pub fn frequency_thz(&self) -> f64 {
        ITU_ANCHOR_THZ + ITU_GRID_SPACING_THZ * f64::from(self.0)
    }

    /// Center wavelength of this channel, nm.
    pub fn wavelength_nm(&self) -> f64 {
        frequency_thz_to_wavelength_nm(self.frequency_thz())
    }

    /// The grid channel closest to a given wavelength.
    pub fn nearest(wavelength_nm: f64) -> Self {
        let freq = wavelength_nm_to_frequency_thz(wavelength_nm);
        let n = ((freq - ITU_ANCHOR_THZ) / ITU_GRID_SPACING_THZ).round();
        Self(n.clamp(0.0, 255.0) as u8)
    }
}

/// Free spectral range of a microring resonator, in nm.
///
/// `FSR = λ² / (n_g · L)` with `L = 2πr`. A ring is resolvable on the DWDM
/// grid only when its FSR exceeds [`DWDM_CHANNEL_SPACING_NM`].
pub fn fsr_nm(ring_radius_um: f64, wavelength_nm: f64, group_index: f64) -> f64 {
    let circumference_m = 2.0 * std::f64::consts::PI * (ring_radius_um * 1e-6);
    let wavelength_m = wavelength_nm * 1e-9;
    let fsr_m = wavelength_m * wavelength_m / (group_index * circumference_m);
    fsr_m * 1e9
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_conversion() {
        let nm = 1550.0;
        let thz = wavelength_nm_to_frequency_thz(nm);
        assert!((thz - 193.414).abs() < 0.001);
        assert!((frequency_thz_to_wavelength_nm(thz) - nm).abs() < 1e-9);
    }

    #[test]
    fn test_itu_channel_frequencies() {
        // Channel 34 = 193.4 THz, the textbook center of the C-band.
        let ch = ItuChannel(34);
        assert!((ch.frequency_thz() - 193.4).abs() < 1e-9);
        assert!((ch.wavelength_nm() - 1550.116).abs() < 0.001);
    }

    #[test]
    fn test_nearest_channel() {
        assert_eq!(ItuChannel::nearest(1550.116), ItuChannel(34));
        assert_eq!(ItuChannel::nearest(1550.5), ItuChannel(34));
        assert_eq!(ItuChannel::nearest(1549.3), ItuChannel(35));
    }

    #[test]
    fn test_channel_spacing_near_1550() {
        let spacing = ItuChannel(34).wavelength_nm() - ItuChannel(35).wavelength_nm();
        assert!((spacing - DWDM_CHANNEL_SPACING_NM).abs() < 0.01);
    }

    #[test]
    fn test_fsr_shrinks_with_radius() {
        // Silicon rings at 1550 nm: only small radii resolve on the grid.
        let small = fsr_nm(20.0, 1550.0, 3.48);
        let large = fsr_nm(140.0, 1550.0, 3.48);
        assert!(small > large);
        assert!(small > DWDM_CHANNEL_SPACING_NM);
        assert!(large < DWDM_CHANNEL_SPACING_NM);
    }
}
