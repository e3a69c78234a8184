/// Example defaults for a single `p2.xlarge` GPU setup.
pub mod defaults {
    pub const COMPUTE_ENVIRONMENT: &str = "gpu";
    pub const INSTANCE_TYPE: &str = "p2.xlarge";
    /// vCPUs in one `p2.xlarge`.
    pub const UNIT_VCPUS: i32 = 4;
    /// Memory in MiB reserved for one `p2.xlarge` worth of job.
    pub const UNIT_MEMORY_MIB: i32 = 61000;
    pub const JOB_DEFINITION: &str = "mxnet";
    pub const IMAGE: &str = "mxnet/python:gpu";

    pub const JOB_NAME: &str = "train_rnn_mnist";
    pub const JOB_QUEUE: &str = "gpu_queue";
    pub const COMMAND: &str = "python /mxnet/example/image-classification/train_mnist.py --network lenet --gpus 0 --model-prefix /mnt/model/mnist";

    pub const REGION: &str = "us-east-1";
}

pub mod naming {
    pub const QUEUE_SUFFIX: &str = "_queue";
    pub const LOG_GROUP: &str = "/aws/batch/job";
}

/// Host driver passthrough for the nvidia-docker volume layout.
pub mod nvidia {
    pub const DRIVER_VOLUME: &str = "nvidia-driver-dir";
    pub const DRIVER_HOST_PATH: &str = "/var/lib/nvidia-docker/volumes/nvidia_driver/latest";
    pub const DRIVER_CONTAINER_PATH: &str = "/usr/local/nvidia";
}

pub mod output {
    pub const BANNER_WIDTH: usize = 80;
    pub const SPINNER: [char; 8] = ['-', '/', '|', '\\', '-', '/', '|', '\\'];
}
