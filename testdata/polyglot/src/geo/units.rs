pub struct Meters(pub f64);

impl Meters {
    pub fn value(&self) -> f64 {
        self.0
    }
}
