pub(crate) mod add;
pub(crate) mod channel_bias_add;
pub(crate) mod channel_softmax;
pub(crate) mod concat;
pub(crate) mod conv2d;
pub(crate) mod gram;
pub(crate) mod identity;
pub(crate) mod leaky_relu;
pub(crate) mod scalar_multiply;
pub(crate) mod sigmoid;
pub(crate) mod subtract;
pub(crate) mod tanh;
pub(crate) mod unfold;
pub(crate) mod upsample_nearest;

pub(in crate::nn) use add::Add;
pub(in crate::nn) use channel_bias_add::ChannelBiasAdd;
pub(in crate::nn) use channel_softmax::ChannelSoftmax;
pub(in crate::nn) use concat::Concat;
pub(in crate::nn) use conv2d::Conv2d;
pub(in crate::nn) use gram::Gram;
pub(in crate::nn) use identity::Identity;
pub(in crate::nn) use leaky_relu::LeakyRelu;
pub(in crate::nn) use scalar_multiply::ScalarMultiply;
pub(in crate::nn) use sigmoid::Sigmoid;
pub(in crate::nn) use subtract::Subtract;
pub(in crate::nn) use tanh::Tanh;
pub(in crate::nn) use unfold::Unfold;
pub(in crate::nn) use upsample_nearest::UpsampleNearest;
