use ash::vk;
use std::mem::size_of;
use std::str::FromStr;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
  #[error("unsupported vertex layout attribute code {0}")]
  UnsupportedCode(u32),
  #[error("unsupported vertex layout attribute `{0}`")]
  UnsupportedName(String),
  #[error("vertex layout has no attributes")]
  Empty,
}

/// Attribute kinds that can appear in a vertex layout. The discriminants are
/// the layout codes accepted by `VertexLayout::try_from(&[u32])`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum VertexComponent {
  Position = 0,
  Normal = 1,
  Color = 2,
  Uv = 3,
  Tangent = 4,
  Bitangent = 5,
  DummyFloat = 6,
  DummyVec4 = 7,
}

impl VertexComponent {
  pub fn component_count(self) -> u32 {
    match self {
      VertexComponent::Uv => 2,
      VertexComponent::DummyFloat => 1,
      VertexComponent::DummyVec4 => 4,
      _ => 3,
    }
  }

  /// Size in bytes.
  pub fn size(self) -> u32 {
    self.component_count() * size_of::<f32>() as u32
  }

  pub fn format(self) -> vk::Format {
    match self.component_count() {
      1 => vk::Format::R32_SFLOAT,
      2 => vk::Format::R32G32_SFLOAT,
      4 => vk::Format::R32G32B32A32_SFLOAT,
      _ => vk::Format::R32G32B32_SFLOAT,
    }
  }

  pub fn name(self) -> &'static str {
    match self {
      VertexComponent::Position => "position",
      VertexComponent::Normal => "normal",
      VertexComponent::Color => "color",
      VertexComponent::Uv => "uv",
      VertexComponent::Tangent => "tangent",
      VertexComponent::Bitangent => "bitangent",
      VertexComponent::DummyFloat => "dummy-float",
      VertexComponent::DummyVec4 => "dummy-vec4",
    }
  }
}

impl TryFrom<u32> for VertexComponent {
  type Error = LayoutError;

  fn try_from(code: u32) -> Result<Self, Self::Error> {
    match code {
      0 => Ok(VertexComponent::Position),
      1 => Ok(VertexComponent::Normal),
      2 => Ok(VertexComponent::Color),
      3 => Ok(VertexComponent::Uv),
      4 => Ok(VertexComponent::Tangent),
      5 => Ok(VertexComponent::Bitangent),
      6 => Ok(VertexComponent::DummyFloat),
      7 => Ok(VertexComponent::DummyVec4),
      _ => Err(LayoutError::UnsupportedCode(code)),
    }
  }
}

impl FromStr for VertexComponent {
  type Err = LayoutError;

  /// Attribute name, or its numeric layout code.
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    if let Ok(code) = s.trim().parse::<u32>() {
      return VertexComponent::try_from(code);
    }
    match s.trim().to_ascii_lowercase().as_str() {
      "position" | "pos" => Ok(VertexComponent::Position),
      "normal" => Ok(VertexComponent::Normal),
      "color" | "colour" => Ok(VertexComponent::Color),
      "uv" | "texcoord" => Ok(VertexComponent::Uv),
      "tangent" => Ok(VertexComponent::Tangent),
      "bitangent" | "binormal" => Ok(VertexComponent::Bitangent),
      "dummy-float" | "pad-float" => Ok(VertexComponent::DummyFloat),
      "dummy-vec4" | "pad-vec4" => Ok(VertexComponent::DummyVec4),
      _ => Err(LayoutError::UnsupportedName(s.trim().to_string())),
    }
  }
}

/// Ordered attribute list of one interleaved vertex. Never empty.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VertexLayout {
  components: Vec<VertexComponent>,
}

impl VertexLayout {
  pub fn new(components: Vec<VertexComponent>) -> Result<Self, LayoutError> {
    if components.is_empty() {
      return Err(LayoutError::Empty);
    }
    Ok(Self { components })
  }

  pub fn components(&self) -> &[VertexComponent] {
    &self.components
  }

  /// Bytes per vertex.
  pub fn stride(&self) -> u32 {
    self.components.iter().map(|x| x.size()).sum()
  }

  pub fn floats_per_vertex(&self) -> usize {
    self.components.iter().map(|x| x.component_count() as usize).sum()
  }

  pub fn binding_description(&self, binding: u32) -> vk::VertexInputBindingDescription {
    vk::VertexInputBindingDescription {
      binding,
      stride: self.stride(),
      input_rate: vk::VertexInputRate::VERTEX,
    }
  }

  /// One attribute per component, locations assigned in layout order.
  pub fn attribute_descriptions(&self, binding: u32) -> Vec<vk::VertexInputAttributeDescription> {
    let mut offset = 0;
    self
      .components
      .iter()
      .enumerate()
      .map(|(location, component)| {
        let description = vk::VertexInputAttributeDescription {
          binding,
          location: location as u32,
          format: component.format(),
          offset,
        };
        offset += component.size();
        description
      })
      .collect::<Vec<_>>()
  }
}

impl TryFrom<&[u32]> for VertexLayout {
  type Error = LayoutError;

  fn try_from(codes: &[u32]) -> Result<Self, Self::Error> {
    let components = codes
      .iter()
      .map(|&code| VertexComponent::try_from(code))
      .collect::<Result<Vec<_>, _>>()?;
    Self::new(components)
  }
}

impl TryFrom<&[VertexComponent]> for VertexLayout {
  type Error = LayoutError;

  fn try_from(components: &[VertexComponent]) -> Result<Self, Self::Error> {
    Self::new(components.to_vec())
  }
}

impl TryFrom<&str> for VertexLayout {
  type Error = LayoutError;

  fn try_from(s: &str) -> Result<Self, Self::Error> {
    s.parse()
  }
}

impl FromStr for VertexLayout {
  type Err = LayoutError;

  /// Comma separated attribute names, e.g. `position,normal,uv`.
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let components = s
      .split(',')
      .filter(|x| !x.trim().is_empty())
      .map(VertexComponent::from_str)
      .collect::<Result<Vec<_>, _>>()?;
    Self::new(components)
  }
}
