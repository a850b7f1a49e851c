//! Per-program tables mapping uniform and attribute names to binding slots.
//!
//! A [`BindingTable`] is produced once when a program is linked. Callers look up a
//! [`UniformId`] or [`AttributeId`] by name while building render passes; the pass
//! executor later turns those ids into the driver's [`BindingSlot`]s.
//!
//! Names the driver cannot resolve still get an id, paired with
//! [`BindingSlot::INVALID`]. Writing through an invalid slot does nothing, the same
//! way a GL driver ignores uniform location `-1`, so requesting a uniform the shader
//! optimized away is never an error.

/// Driver-resolved location of a uniform or vertex attribute within a program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindingSlot(i32);

impl BindingSlot {
    /// Slot given to names the driver could not resolve.
    pub const INVALID: BindingSlot = BindingSlot(-1);

    /// Creates a slot from a driver index.
    pub fn new(index: u32) -> Self {
        i32::try_from(index).map_or(Self::INVALID, BindingSlot)
    }

    /// Returns the slot index, or `None` for [`BindingSlot::INVALID`].
    pub fn index(self) -> Option<usize> {
        usize::try_from(self.0).ok()
    }

    /// Whether this slot addresses something in the program.
    pub fn is_valid(self) -> bool {
        self.0 >= 0
    }
}

impl From<Option<u32>> for BindingSlot {
    fn from(index: Option<u32>) -> Self {
        index.map_or(Self::INVALID, Self::new)
    }
}

/// Index of a requested uniform name within its program's table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformId(usize);

/// Index of a requested attribute name within its program's table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttributeId(usize);

#[derive(Debug, Clone)]
struct Binding {
    name: String,
    slot: BindingSlot,
}

/// Resolved uniform and attribute slots of one linked program, in request order.
#[derive(Debug, Clone, Default)]
pub struct BindingTable {
    uniforms: Vec<Binding>,
    attributes: Vec<Binding>,
}

impl BindingTable {
    /// Resolves every requested name through the driver lookups.
    ///
    /// # Arguments
    ///
    /// * `uniform_names` - Uniform names in the order the caller wants to address them
    /// * `attribute_names` - Vertex attribute names, same convention
    /// * `uniform_slot` - Driver lookup for a uniform name
    /// * `attribute_slot` - Driver lookup for an attribute name
    pub fn resolve<U, A>(
        uniform_names: &[&str],
        attribute_names: &[&str],
        mut uniform_slot: U,
        mut attribute_slot: A,
    ) -> Self
    where
        U: FnMut(&str) -> BindingSlot,
        A: FnMut(&str) -> BindingSlot,
    {
        let uniforms = uniform_names
            .iter()
            .map(|&name| Binding {
                name: name.to_string(),
                slot: uniform_slot(name),
            })
            .collect();
        let attributes = attribute_names
            .iter()
            .map(|&name| Binding {
                name: name.to_string(),
                slot: attribute_slot(name),
            })
            .collect();

        Self {
            uniforms,
            attributes,
        }
    }

    /// Looks up the id of a requested uniform.
    pub fn uniform(&self, name: &str) -> Option<UniformId> {
        self.uniforms
            .iter()
            .position(|b| b.name == name)
            .map(UniformId)
    }

    /// Looks up the id of a requested attribute.
    pub fn attribute(&self, name: &str) -> Option<AttributeId> {
        self.attributes
            .iter()
            .position(|b| b.name == name)
            .map(AttributeId)
    }

    /// Driver slot of a uniform.
    ///
    /// # Panics
    ///
    /// Panics if `id` came from another program's table and is out of range.
    pub fn uniform_slot(&self, id: UniformId) -> BindingSlot {
        self.uniforms[id.0].slot
    }

    /// Driver slot of an attribute.
    ///
    /// # Panics
    ///
    /// Panics if `id` came from another program's table and is out of range.
    pub fn attribute_slot(&self, id: AttributeId) -> BindingSlot {
        self.attributes[id.0].slot
    }

    /// Slots of every requested attribute, in request order.
    pub fn attribute_slots(&self) -> impl Iterator<Item = BindingSlot> + '_ {
        self.attributes.iter().map(|b| b.slot)
    }

    /// `(name, slot)` pairs of the requested uniforms.
    pub fn uniforms(&self) -> impl Iterator<Item = (&str, BindingSlot)> {
        self.uniforms.iter().map(|b| (b.name.as_str(), b.slot))
    }

    /// `(name, slot)` pairs of the requested attributes.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, BindingSlot)> {
        self.attributes.iter().map(|b| (b.name.as_str(), b.slot))
    }
}
